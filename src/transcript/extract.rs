use tracing::{debug, warn};

use crate::model::{SpeakerLine, Turn, TurnCategory};

use super::classify::{ClassifiedNode, NodeRole, parse_speaker_line};
use super::context::ContextAccumulator;
use super::cursor::NodeCursor;
use super::evidence::{EvidenceLedger, EvidenceResolver, Introduction, announced_name};

#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    pub keep_truncated_sections: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            keep_truncated_sections: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct PartExtraction {
    pub turns: Vec<Turn>,
    pub narrative_text: String,
    pub announced: Vec<String>,
    pub truncated_sections: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug)]
struct OpenSection {
    category: TurnCategory,
    context_snapshot: String,
    second_bar: usize,
    speaker_lines: Vec<SpeakerLine>,
}

#[derive(Debug)]
enum ScanState {
    Scanning,
    InSection(OpenSection),
    Done,
}

pub struct TurnExtractor<'r> {
    resolver: &'r EvidenceResolver,
    ledger: &'r mut EvidenceLedger,
    part_index: usize,
    options: ExtractOptions,
    context: ContextAccumulator,
    output: PartExtraction,
}

impl<'r> TurnExtractor<'r> {
    pub fn new(
        resolver: &'r EvidenceResolver,
        ledger: &'r mut EvidenceLedger,
        part_index: usize,
        options: ExtractOptions,
    ) -> Self {
        Self {
            resolver,
            ledger,
            part_index,
            options,
            context: ContextAccumulator::default(),
            output: PartExtraction::default(),
        }
    }

    pub fn run(mut self, nodes: &[ClassifiedNode<'_>]) -> PartExtraction {
        let mut cursor = NodeCursor::new(nodes);
        let mut state = ScanState::Scanning;

        loop {
            state = match state {
                ScanState::Scanning => match cursor.advance() {
                    None => ScanState::Done,
                    Some(item) => match item.role {
                        NodeRole::SectionStart(category) => {
                            let second_bar = locate_second_bar(cursor);
                            debug!(
                                category = category.as_str(),
                                start = cursor.position() - 1,
                                second_bar,
                                "interactive section opened"
                            );
                            ScanState::InSection(OpenSection {
                                category,
                                context_snapshot: self.context.section_snapshot(),
                                second_bar,
                                speaker_lines: Vec::new(),
                            })
                        }
                        _ => {
                            self.absorb(item);
                            ScanState::Scanning
                        }
                    },
                },
                ScanState::InSection(mut section) => match cursor.peek() {
                    None => {
                        self.close_truncated(section);
                        ScanState::Done
                    }
                    Some(item) => match item.role {
                        NodeRole::SectionEnd if cursor.position() >= section.second_bar => {
                            cursor.advance();
                            self.close(section);
                            ScanState::Scanning
                        }
                        NodeRole::SectionStart(_) => {
                            self.warn(format!(
                                "{} section at node {} closed by the next section start",
                                section.category.as_str(),
                                cursor.position()
                            ));
                            self.close(section);
                            ScanState::Scanning
                        }
                        NodeRole::SpeakerLine => {
                            cursor.advance();
                            let line = self.speaker_line(item, &mut cursor);
                            section.speaker_lines.push(line);
                            ScanState::InSection(section)
                        }
                        _ => {
                            cursor.advance();
                            self.absorb(item);
                            ScanState::InSection(section)
                        }
                    },
                },
                ScanState::Done => break,
            };
        }

        self.output.narrative_text = self.context.into_part_text();
        self.output
    }

    fn absorb(&mut self, item: &ClassifiedNode<'_>) {
        match item.role {
            NodeRole::PlainText | NodeRole::SpeakerLine => self.context.append(&item.node.text),
            NodeRole::EvidenceAnnouncement => {
                self.context.append(&item.node.text);
                self.announce(&item.node.text);
            }
            NodeRole::EvidencePresentationTable
            | NodeRole::SectionStart(_)
            | NodeRole::SectionEnd
            | NodeRole::Skip => {}
        }
    }

    fn announce(&mut self, text: &str) {
        let Some(name) = announced_name(text) else {
            return;
        };

        match self.ledger.introduce(&name, self.part_index) {
            Introduction::Moved(roster_name) => {
                debug!(
                    evidence = %roster_name,
                    remaining = self.ledger.remaining().count(),
                    "evidence added to the court record"
                );
                self.output.announced.push(roster_name);
            }
            Introduction::AlreadyIntroduced(roster_name) => {
                debug!(evidence = %roster_name, "evidence already in the court record");
            }
            Introduction::Unknown => {
                self.warn(format!("court record notice names unknown evidence: {name}"));
            }
        }
    }

    fn speaker_line(
        &mut self,
        item: &ClassifiedNode<'_>,
        cursor: &mut NodeCursor<'_, ClassifiedNode<'_>>,
    ) -> SpeakerLine {
        let parsed = parse_speaker_line(&item.node.text);
        if !parsed.recognized {
            self.warn(format!(
                "speaker line without a name separator at node {}",
                cursor.position() - 1
            ));
        }

        let mut presentable_evidence = Vec::new();
        for table in cursor.advance_while(|next| next.node.is_table()) {
            if table.role != NodeRole::EvidencePresentationTable {
                debug!("skipping non-presentation table after speaker line");
                continue;
            }
            let Some(title) = table.node.table_title.as_ref() else {
                continue;
            };
            let resolved = self.resolver.resolve(title, self.ledger.roster());
            for name in &resolved.unmatched {
                self.warn(format!("presentable evidence not in roster: {name}"));
            }
            presentable_evidence.extend(resolved.names);
        }

        SpeakerLine {
            line: parsed.line,
            person: parsed.person,
            presentable_evidence,
        }
    }

    fn close(&mut self, section: OpenSection) {
        let turn = Turn::new(
            section.category,
            section.context_snapshot,
            section.speaker_lines,
        );
        debug!(
            category = turn.category.as_str(),
            speaker_lines = turn.speaker_lines.len(),
            no_present = turn.has_no_presentable_evidence,
            "turn extracted"
        );
        self.output.turns.push(turn);
        self.context.reset_section();
    }

    fn close_truncated(&mut self, section: OpenSection) {
        self.output.truncated_sections += 1;
        if self.options.keep_truncated_sections {
            self.warn(format!(
                "{} section runs to the end of the part; keeping {} speaker lines",
                section.category.as_str(),
                section.speaker_lines.len()
            ));
            self.close(section);
        } else {
            self.warn(format!(
                "{} section runs to the end of the part; discarded",
                section.category.as_str()
            ));
            self.context.reset_section();
        }
    }

    fn warn(&mut self, message: String) {
        warn!(part = self.part_index, "{message}");
        self.output.warnings.push(message);
    }
}

/// Position just past the first section divider at or after the cursor, or
/// the end of the nodes when there is none.
fn locate_second_bar(mut lookahead: NodeCursor<'_, ClassifiedNode<'_>>) -> usize {
    lookahead.advance_while(|item| item.role != NodeRole::SectionEnd);
    lookahead.advance();
    lookahead.position()
}
