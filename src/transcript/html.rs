use anyhow::{Context, Result, anyhow};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use super::node::{DocumentNode, SpanColor, Tag, TableTitle};
use super::normalize::{collapse_whitespace, normalize_lines};

const RED_VALUES: &[&str] = &["red", "#ff0000", "#f00", "rgb(255,0,0)"];
const GREEN_VALUES: &[&str] = &["green", "#008000", "#00ff00", "#0f0", "lime"];
const BLUE_VALUES: &[&str] = &[
    "#0070c0", "blue", "#0000ff", "#00f", "teal", "#008080", "#00b0f0",
];
const BOILERPLATE_TAGS: &[&str] = &[
    "nav", "navbox", "style", "script", "link", "meta", "noscript",
];
const BOILERPLATE_CLASSES: &[&str] = &["toc", "navbox", "navbox-tabs", "mw-empty-elt"];

#[derive(Debug)]
pub struct ContentFlattener {
    container: Selector,
    styled_span: Selector,
    title_cells: Vec<Selector>,
    link: Selector,
    color_declaration: Regex,
}

impl ContentFlattener {
    pub fn new(container_selector: &str) -> Result<Self> {
        Ok(Self {
            container: parse_selector(container_selector)?,
            styled_span: parse_selector("span[style], font[color]")?,
            title_cells: vec![
                parse_selector("th.navbox1title")?,
                parse_selector("th")?,
                parse_selector("caption")?,
            ],
            link: parse_selector("a")?,
            color_declaration: Regex::new(r"(?i)(?:^|;)\s*color\s*:\s*([^;]+)")
                .context("failed to compile color declaration regex")?,
        })
    }

    pub fn flatten(&self, html: &str) -> Result<Vec<DocumentNode>> {
        let document = Html::parse_document(html);
        let container = document
            .select(&self.container)
            .next()
            .context("could not find the transcript content container")?;

        Ok(container
            .children()
            .filter_map(ElementRef::wrap)
            .map(|element| self.node_from_element(element))
            .collect())
    }

    fn node_from_element(&self, element: ElementRef<'_>) -> DocumentNode {
        let name = element.value().name();
        let tag = Tag::from_name(name);
        let mut node = DocumentNode::new(tag, normalize_lines(&element_text(element)));
        node.is_boilerplate = is_boilerplate(element);

        for span in element.select(&self.styled_span) {
            if let Some(color) = self.span_color(span) {
                node = node.with_span(color, normalize_lines(&element_text(span)));
            }
        }

        if tag == Tag::Table {
            if let Some(title) = self.table_title(element) {
                node = node.with_table_title(title);
            }
        }

        node
    }

    fn span_color(&self, span: ElementRef<'_>) -> Option<SpanColor> {
        let value = match span.value().attr("style") {
            Some(style) => self
                .color_declaration
                .captures(style)?
                .get(1)?
                .as_str()
                .to_string(),
            None => span.value().attr("color")?.to_string(),
        };
        color_from_value(&value)
    }

    fn table_title(&self, table: ElementRef<'_>) -> Option<TableTitle> {
        let cell = self
            .title_cells
            .iter()
            .find_map(|selector| table.select(selector).next())?;

        let text = collapse_whitespace(&element_text(cell));
        if text.is_empty() {
            return None;
        }

        let links = cell
            .select(&self.link)
            .map(|link| collapse_whitespace(&element_text(link)))
            .filter(|link| !link.is_empty())
            .collect();

        Some(TableTitle { text, links })
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|err| anyhow!("invalid CSS selector {selector:?}: {err:?}"))
}

fn color_from_value(value: &str) -> Option<SpanColor> {
    let normalized = value
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect::<String>()
        .trim_end_matches("!important")
        .to_ascii_lowercase();

    if RED_VALUES.contains(&normalized.as_str()) {
        Some(SpanColor::Red)
    } else if GREEN_VALUES.contains(&normalized.as_str()) {
        Some(SpanColor::Green)
    } else if BLUE_VALUES.contains(&normalized.as_str()) {
        Some(SpanColor::Blue)
    } else {
        None
    }
}

fn is_boilerplate(element: ElementRef<'_>) -> bool {
    let value = element.value();
    if BOILERPLATE_TAGS.contains(&value.name()) {
        return true;
    }
    if value.id() == Some("toc") || value.attr("role") == Some("navigation") {
        return true;
    }
    value
        .classes()
        .any(|class| BOILERPLATE_CLASSES.contains(&class))
}

fn element_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(child) if child.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    out
}
