use super::normalize::collapse_whitespace;

const FRAGMENT_SEPARATOR: &str = "\n";

#[derive(Debug, Default)]
pub struct ContextAccumulator {
    part: Vec<String>,
    section: Vec<String>,
}

impl ContextAccumulator {
    pub fn append(&mut self, text: &str) {
        let fragment = collapse_whitespace(text);
        if fragment.is_empty() {
            return;
        }
        self.section.push(fragment.clone());
        self.part.push(fragment);
    }

    pub fn section_snapshot(&self) -> String {
        self.section.join(FRAGMENT_SEPARATOR)
    }

    pub fn reset_section(&mut self) {
        self.section.clear();
    }

    pub fn into_part_text(self) -> String {
        self.part.join(FRAGMENT_SEPARATOR)
    }
}

pub fn carry_forward(previous: &str, part_text: &str) -> String {
    match (previous.is_empty(), part_text.is_empty()) {
        (_, true) => previous.to_string(),
        (true, false) => part_text.to_string(),
        (false, false) => format!("{previous}{FRAGMENT_SEPARATOR}{part_text}"),
    }
}
