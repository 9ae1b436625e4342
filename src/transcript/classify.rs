use anyhow::{Context, Result};
use regex::Regex;

use crate::model::TurnCategory;

use super::node::{DocumentNode, SpanColor, Tag};
use super::normalize::{collapse_whitespace, contains_ignore_ascii_case};

pub const UNKNOWN_SPEAKER: &str = "Unknown";
pub const COURT_RECORD_PHRASE: &str = "added to the court record";

const SECTION_KEYWORDS: &[(&str, TurnCategory)] = &[
    ("cross examination", TurnCategory::CrossExamination),
    ("cross-examination", TurnCategory::CrossExamination),
    ("rebuttal", TurnCategory::Rebuttal),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    PlainText,
    SectionStart(TurnCategory),
    SectionEnd,
    SpeakerLine,
    EvidenceAnnouncement,
    EvidencePresentationTable,
    Skip,
}

#[derive(Debug, Clone, Copy)]
pub struct ClassifiedNode<'a> {
    pub node: &'a DocumentNode,
    pub role: NodeRole,
}

#[derive(Debug)]
pub struct NodeClassifier {
    present_word: Regex,
}

impl NodeClassifier {
    pub fn new() -> Result<Self> {
        Ok(Self {
            present_word: Regex::new(r"(?i)\bpresent\b")
                .context("failed to compile present-title regex")?,
        })
    }

    pub fn classify(&self, node: &DocumentNode) -> NodeRole {
        if node.is_boilerplate {
            return NodeRole::Skip;
        }

        match node.tag {
            Tag::HorizontalRule => NodeRole::SectionEnd,
            Tag::Heading(_) => NodeRole::Skip,
            Tag::Center => match section_category(node) {
                Some(category) => NodeRole::SectionStart(category),
                None => NodeRole::PlainText,
            },
            Tag::Table => {
                let is_presentation = node
                    .table_title
                    .as_ref()
                    .map(|title| self.present_word.is_match(&title.text))
                    .unwrap_or(false);
                if is_presentation {
                    NodeRole::EvidencePresentationTable
                } else {
                    NodeRole::Skip
                }
            }
            Tag::Paragraph if node.has_span(SpanColor::Green) => NodeRole::SpeakerLine,
            Tag::Paragraph
                if node.has_span(SpanColor::Blue)
                    && contains_ignore_ascii_case(&node.text, COURT_RECORD_PHRASE) =>
            {
                NodeRole::EvidenceAnnouncement
            }
            _ => NodeRole::PlainText,
        }
    }

    pub fn classify_all<'a>(&self, nodes: &'a [DocumentNode]) -> Vec<ClassifiedNode<'a>> {
        nodes
            .iter()
            .map(|node| ClassifiedNode {
                node,
                role: self.classify(node),
            })
            .collect()
    }
}

fn section_category(node: &DocumentNode) -> Option<TurnCategory> {
    node.spans(SpanColor::Red).find_map(|span| {
        let label = collapse_whitespace(&span.text).to_lowercase();
        SECTION_KEYWORDS
            .iter()
            .find(|(keyword, _)| label == *keyword)
            .map(|(_, category)| *category)
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSpeakerLine {
    pub person: String,
    pub line: String,
    pub recognized: bool,
}

pub fn parse_speaker_line(text: &str) -> ParsedSpeakerLine {
    let lines = text
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>();

    if let Some((first, rest)) = lines.split_first() {
        if let Some((name, tail)) = first.split_once(':') {
            let name = name.trim();
            if !name.is_empty() {
                let mut parts = Vec::with_capacity(rest.len() + 1);
                if !tail.trim().is_empty() {
                    parts.push(tail.trim());
                }
                parts.extend(rest.iter().map(String::as_str));
                return ParsedSpeakerLine {
                    person: name.to_string(),
                    line: parts.join(" "),
                    recognized: true,
                };
            }
        } else if !rest.is_empty() {
            return ParsedSpeakerLine {
                person: first.clone(),
                line: rest.join(" "),
                recognized: true,
            };
        }
    }

    ParsedSpeakerLine {
        person: UNKNOWN_SPEAKER.to_string(),
        line: collapse_whitespace(text),
        recognized: false,
    }
}
