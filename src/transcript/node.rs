#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Paragraph,
    Heading(u8),
    Table,
    HorizontalRule,
    Center,
    Other,
}

impl Tag {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "p" => Tag::Paragraph,
            "table" => Tag::Table,
            "hr" => Tag::HorizontalRule,
            "center" => Tag::Center,
            "h1" => Tag::Heading(1),
            "h2" => Tag::Heading(2),
            "h3" => Tag::Heading(3),
            "h4" => Tag::Heading(4),
            "h5" => Tag::Heading(5),
            "h6" => Tag::Heading(6),
            _ => Tag::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanColor {
    Red,
    Green,
    Blue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub color: SpanColor,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableTitle {
    pub text: String,
    pub links: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentNode {
    pub tag: Tag,
    pub text: String,
    pub styled_spans: Vec<StyledSpan>,
    pub table_title: Option<TableTitle>,
    pub is_boilerplate: bool,
}

impl DocumentNode {
    pub fn new(tag: Tag, text: impl Into<String>) -> Self {
        Self {
            tag,
            text: text.into(),
            styled_spans: Vec::new(),
            table_title: None,
            is_boilerplate: false,
        }
    }

    pub fn with_span(mut self, color: SpanColor, text: impl Into<String>) -> Self {
        self.styled_spans.push(StyledSpan {
            color,
            text: text.into(),
        });
        self
    }

    pub fn with_table_title(mut self, title: TableTitle) -> Self {
        self.table_title = Some(title);
        self
    }

    pub fn spans(&self, color: SpanColor) -> impl Iterator<Item = &StyledSpan> {
        self.styled_spans
            .iter()
            .filter(move |span| span.color == color)
    }

    pub fn has_span(&self, color: SpanColor) -> bool {
        self.spans(color).next().is_some()
    }

    pub fn is_table(&self) -> bool {
        self.tag == Tag::Table
    }
}
