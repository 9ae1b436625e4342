use crate::model::{ChapterDocument, CharacterItem, EvidenceItem, Turn};

use super::context::carry_forward;
use super::evidence::EvidenceLedger;

#[derive(Debug, Clone)]
pub struct ChapterRosters {
    pub chapter: String,
    pub characters: Vec<CharacterItem>,
    pub evidences: Vec<EvidenceItem>,
}

#[derive(Debug, Clone)]
pub struct ChapterState {
    pub previous_context: String,
    pub ledger: EvidenceLedger,
    pub next_part: usize,
}

impl ChapterState {
    pub fn new(rosters: &ChapterRosters) -> Self {
        Self {
            previous_context: String::new(),
            ledger: EvidenceLedger::new(rosters.evidences.clone()),
            next_part: 1,
        }
    }
}

pub fn assemble_part(
    previous_context: String,
    characters: &[CharacterItem],
    evidences: Vec<EvidenceItem>,
    turns: Vec<Turn>,
    narrative_text: &str,
) -> (ChapterDocument, String) {
    let carried = carry_forward(&previous_context, narrative_text);
    let document = ChapterDocument {
        previous_context,
        characters: characters.to_vec(),
        evidences,
        turns,
    };
    (document, carried)
}
