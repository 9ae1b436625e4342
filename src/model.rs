use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterSpec {
    pub name: String,
    pub file_identifier: String,
    pub output_prefix: String,
    pub evidence_roster: String,
    pub character_roster: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterManifest {
    pub manifest_version: u32,
    pub chapters: Vec<ChapterSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtmlPartEntry {
    pub filename: String,
    pub part: Option<u32>,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryChapter {
    pub chapter: String,
    pub file_identifier: String,
    pub parts: Vec<HtmlPartEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtmlInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub part_count: usize,
    pub chapters: Vec<InventoryChapter>,
}

/// Ordered `descriptionN` fields of a roster record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptionParts(pub Vec<String>);

const DESCRIPTION_KEY_PREFIX: &str = "description";

impl Serialize for DescriptionParts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (index, part) in self.0.iter().enumerate() {
            map.serialize_entry(&format!("{DESCRIPTION_KEY_PREFIX}{}", index + 1), part)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DescriptionParts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(DescriptionPartsVisitor)
    }
}

struct DescriptionPartsVisitor;

impl<'de> Visitor<'de> for DescriptionPartsVisitor {
    type Value = DescriptionParts;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map with descriptionN string fields")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut numbered = Vec::<(u32, String)>::new();

        while let Some((key, value)) = access.next_entry::<String, serde_json::Value>()? {
            let Some(index) = key
                .strip_prefix(DESCRIPTION_KEY_PREFIX)
                .and_then(|suffix| suffix.parse::<u32>().ok())
            else {
                continue;
            };
            if let serde_json::Value::String(text) = value {
                numbered.push((index, text));
            }
        }

        numbered.sort_by_key(|(index, _)| *index);
        Ok(DescriptionParts(
            numbered.into_iter().map(|(_, text)| text).collect(),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    #[serde(
        rename = "currentChapter",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub current_chapter: Option<String>,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "obtained", default)]
    pub obtained_how: String,
    #[serde(flatten)]
    pub description_parts: DescriptionParts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterItem {
    #[serde(
        rename = "currentChapter",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub current_chapter: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(flatten)]
    pub description_parts: DescriptionParts,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChapterEvidenceRoster {
    pub chapter: String,
    #[serde(default)]
    pub evidences: Vec<EvidenceItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChapterCharacterRoster {
    pub chapter: String,
    #[serde(default)]
    pub characters: Vec<CharacterItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnCategory {
    CrossExamination,
    Rebuttal,
}

impl TurnCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnCategory::CrossExamination => "cross_examination",
            TurnCategory::Rebuttal => "rebuttal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerLine {
    #[serde(rename = "testimony")]
    pub line: String,
    pub person: String,
    #[serde(rename = "present", default)]
    pub presentable_evidence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub category: TurnCategory,
    #[serde(rename = "newContext", alias = "new_context", default)]
    pub context_snapshot: String,
    #[serde(rename = "testimonies", default)]
    pub speaker_lines: Vec<SpeakerLine>,
    #[serde(rename = "noPresent", alias = "no_present")]
    pub has_no_presentable_evidence: bool,
}

impl Turn {
    pub fn new(
        category: TurnCategory,
        context_snapshot: String,
        speaker_lines: Vec<SpeakerLine>,
    ) -> Self {
        let has_no_presentable_evidence = speaker_lines
            .iter()
            .all(|line| line.presentable_evidence.is_empty());
        Self {
            category,
            context_snapshot,
            speaker_lines,
            has_no_presentable_evidence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterDocument {
    pub previous_context: String,
    pub characters: Vec<CharacterItem>,
    pub evidences: Vec<EvidenceItem>,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractPaths {
    pub cache_root: String,
    pub raw_dir: String,
    pub output_dir: String,
    pub chapters_path: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractCounts {
    pub chapters_total: usize,
    pub chapters_processed: usize,
    pub chapters_skipped: usize,
    pub parts_processed: usize,
    pub parts_failed: usize,
    pub documents_written: usize,
    pub turns_total: usize,
    pub speaker_lines_total: usize,
    pub turns_with_evidence: usize,
    pub truncated_sections: usize,
    pub warnings_total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartRunSummary {
    pub part_index: usize,
    pub source_file: String,
    pub source_hash: Option<String>,
    pub output_file: Option<String>,
    pub status: String,
    pub turns: usize,
    pub speaker_lines: usize,
    pub previous_context_chars: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChapterRunSummary {
    pub chapter: String,
    pub status: String,
    pub reason: Option<String>,
    pub evidences_introduced: usize,
    pub parts: Vec<PartRunSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub truncated_section_policy: String,
    pub paths: ExtractPaths,
    pub counts: ExtractCounts,
    pub chapters: Vec<ChapterRunSummary>,
    pub warnings: Vec<String>,
}
