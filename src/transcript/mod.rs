use anyhow::Result;

use crate::model::ChapterDocument;

mod assemble;
mod classify;
mod context;
mod cursor;
mod evidence;
mod extract;
mod html;
mod node;
mod normalize;

pub use assemble::{ChapterRosters, ChapterState};
pub use evidence::ANYTHING_ELSE;
pub use extract::ExtractOptions;
pub use node::DocumentNode;
pub use normalize::normalize_chapter_name;

use assemble::assemble_part;
use classify::NodeClassifier;
use evidence::EvidenceResolver;
use extract::TurnExtractor;
use html::ContentFlattener;

#[derive(Debug)]
pub struct PartOutput {
    pub part_index: usize,
    pub document: ChapterDocument,
    pub announced: Vec<String>,
    pub truncated_sections: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug)]
pub struct TranscriptParser {
    flattener: ContentFlattener,
    classifier: NodeClassifier,
    resolver: EvidenceResolver,
    options: ExtractOptions,
}

impl TranscriptParser {
    pub fn new(content_selector: &str, options: ExtractOptions) -> Result<Self> {
        Ok(Self {
            flattener: ContentFlattener::new(content_selector)?,
            classifier: NodeClassifier::new()?,
            resolver: EvidenceResolver::new()?,
            options,
        })
    }

    pub fn flatten(&self, html: &str) -> Result<Vec<DocumentNode>> {
        self.flattener.flatten(html)
    }

    pub fn extract_part(
        &self,
        nodes: &[DocumentNode],
        rosters: &ChapterRosters,
        state: ChapterState,
    ) -> (PartOutput, ChapterState) {
        let ChapterState {
            previous_context,
            mut ledger,
            next_part,
        } = state;
        let part_index = next_part;

        let classified = self.classifier.classify_all(nodes);
        let extraction =
            TurnExtractor::new(&self.resolver, &mut ledger, part_index, self.options)
                .run(&classified);

        let evidences = ledger.starting_record(part_index);
        let (document, carried) = assemble_part(
            previous_context,
            &rosters.characters,
            evidences,
            extraction.turns,
            &extraction.narrative_text,
        );

        let output = PartOutput {
            part_index,
            document,
            announced: extraction.announced,
            truncated_sections: extraction.truncated_sections,
            warnings: extraction.warnings,
        };
        let state = ChapterState {
            previous_context: carried,
            ledger,
            next_part: part_index + 1,
        };
        (output, state)
    }
}
