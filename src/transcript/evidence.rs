use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::model::EvidenceItem;

use super::classify::COURT_RECORD_PHRASE;
use super::node::TableTitle;
use super::normalize::{collapse_whitespace, find_ignore_ascii_case, same_name};

pub const ANYTHING_ELSE: &str = "Anything Else";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ResolvedTitle {
    pub names: Vec<String>,
    pub unmatched: Vec<String>,
}

#[derive(Debug)]
pub struct EvidenceResolver {
    present_word: Regex,
    or_separator: Regex,
}

impl EvidenceResolver {
    pub fn new() -> Result<Self> {
        Ok(Self {
            present_word: Regex::new(r"(?i)\bpresent\b:?")
                .context("failed to compile present-word regex")?,
            or_separator: Regex::new(r"(?i)\s+or\s+").context("failed to compile or regex")?,
        })
    }

    pub fn resolve(&self, title: &TableTitle, roster: &[EvidenceItem]) -> ResolvedTitle {
        let candidates: Vec<String> = if title.links.is_empty() {
            let remainder = self.present_word.replacen(&title.text, 1, "");
            self.or_separator
                .split(&remainder)
                .map(ToOwned::to_owned)
                .collect()
        } else {
            title.links.clone()
        };

        let mut resolved = ResolvedTitle::default();
        for candidate in candidates {
            let name = collapse_whitespace(&candidate);
            if name.is_empty() {
                continue;
            }
            if name.eq_ignore_ascii_case(ANYTHING_ELSE) {
                debug!(title = %title.text, "dropping placeholder presentation choice");
                continue;
            }

            match roster.iter().find(|item| same_name(&item.name, &name)) {
                Some(item) => resolved.names.push(item.name.trim().to_string()),
                None => {
                    resolved.unmatched.push(name.clone());
                    resolved.names.push(name);
                }
            }
        }

        resolved
    }
}

pub fn announced_name(text: &str) -> Option<String> {
    let flat = collapse_whitespace(text);
    let offset = find_ignore_ascii_case(&flat, COURT_RECORD_PHRASE)?;
    let name = flat[..offset]
        .trim()
        .trim_matches(|ch: char| ch == '"' || ch == '\'' || ch == '“' || ch == '”')
        .trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Introduction {
    Moved(String),
    AlreadyIntroduced(String),
    Unknown,
}

#[derive(Debug, Clone)]
pub struct EvidenceLedger {
    items: Vec<EvidenceItem>,
    introduced_in: Vec<Option<usize>>,
}

impl EvidenceLedger {
    pub fn new(roster: Vec<EvidenceItem>) -> Self {
        let introduced_in = vec![None; roster.len()];
        Self {
            items: roster,
            introduced_in,
        }
    }

    pub fn roster(&self) -> &[EvidenceItem] {
        &self.items
    }

    pub fn remaining(&self) -> impl Iterator<Item = &EvidenceItem> {
        self.items
            .iter()
            .zip(&self.introduced_in)
            .filter(|(_, introduced)| introduced.is_none())
            .map(|(item, _)| item)
    }

    pub fn introduced_count(&self) -> usize {
        self.introduced_in
            .iter()
            .filter(|introduced| introduced.is_some())
            .count()
    }

    pub fn introduce(&mut self, announced: &str, part_index: usize) -> Introduction {
        let Some(index) = self.lookup(announced) else {
            return Introduction::Unknown;
        };
        let name = self.items[index].name.trim().to_string();
        match self.introduced_in[index] {
            Some(_) => Introduction::AlreadyIntroduced(name),
            None => {
                self.introduced_in[index] = Some(part_index);
                Introduction::Moved(name)
            }
        }
    }

    /// Court record at the start of `part_index`: every roster item except
    /// those first introduced during that part.
    pub fn starting_record(&self, part_index: usize) -> Vec<EvidenceItem> {
        self.items
            .iter()
            .zip(&self.introduced_in)
            .filter(|(_, introduced)| **introduced != Some(part_index))
            .map(|(item, _)| item.clone())
            .collect()
    }

    fn lookup(&self, announced: &str) -> Option<usize> {
        if let Some(index) = self
            .items
            .iter()
            .position(|item| same_name(&item.name, announced))
        {
            return Some(index);
        }

        // Notices often wrap the name ("The Autopsy Report was added ...").
        let lowered = collapse_whitespace(announced).to_lowercase();
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| {
                let name = collapse_whitespace(&item.name).to_lowercase();
                !name.is_empty() && lowered.contains(&name)
            })
            .max_by_key(|(_, item)| item.name.len())
            .map(|(index, _)| index)
    }
}
