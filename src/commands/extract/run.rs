use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::cli::{ExtractArgs, TruncatedSectionPolicy};
use crate::commands::inventory;
use crate::model::{
    ChapterRunSummary, ChapterSpec, ExtractCounts, ExtractPaths, ExtractRunManifest,
    HtmlPartEntry, PartRunSummary,
};
use crate::transcript::{
    ChapterState, DocumentNode, ExtractOptions, TranscriptParser, normalize_chapter_name,
};
use crate::util::{ensure_directory, now_utc_string, utc_compact_string, write_json_pretty};

use super::rosters::load_rosters;

pub fn run(args: ExtractArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let cache_root = args.cache_root.clone();
    let manifest_dir = cache_root.join("manifests");
    let raw_dir = cache_root.join("raw");
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| cache_root.join("parsed_full_context"));
    let run_manifest_path = args.run_manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!(
            "extract_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });

    info!(cache_root = %cache_root.display(), run_id = %run_id, "starting extract");

    let (chapter_manifest, chapters_source) =
        inventory::resolve_chapter_manifest(args.chapters_path.as_deref(), &cache_root)?;
    let selected = select_chapters(&chapter_manifest.chapters, &args.chapters)?;

    let parser = TranscriptParser::new(
        &args.content_selector,
        ExtractOptions {
            keep_truncated_sections: args.truncated_sections == TruncatedSectionPolicy::Keep,
        },
    )?;
    let part_pattern = inventory::part_number_pattern()?;

    if !args.dry_run {
        ensure_directory(&output_dir)?;
    }

    let job = ExtractJob {
        parser: &parser,
        part_pattern: &part_pattern,
        cache_root: &cache_root,
        raw_dir: &raw_dir,
        output_dir: &output_dir,
        dry_run: args.dry_run,
    };

    let mut counts = ExtractCounts {
        chapters_total: selected.len(),
        ..ExtractCounts::default()
    };
    let mut warnings = Vec::new();
    let mut chapters = Vec::with_capacity(selected.len());
    for chapter in selected {
        chapters.push(job.extract_chapter(chapter, &mut counts, &mut warnings));
    }
    counts.warnings_total = warnings.len();

    let status = if counts.parts_failed == 0 {
        "completed"
    } else {
        "completed_with_failures"
    };

    let manifest = ExtractRunManifest {
        manifest_version: 1,
        run_id,
        status: status.to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: render_extract_command(&args),
        truncated_section_policy: args.truncated_sections.as_str().to_string(),
        paths: ExtractPaths {
            cache_root: cache_root.display().to_string(),
            raw_dir: raw_dir.display().to_string(),
            output_dir: output_dir.display().to_string(),
            chapters_path: chapters_source,
        },
        counts,
        chapters,
        warnings,
    };

    if args.dry_run {
        info!("dry-run: run manifest not written");
    } else {
        write_json_pretty(&run_manifest_path, &manifest)?;
        info!(path = %run_manifest_path.display(), "wrote extract run manifest");
    }

    let counts = &manifest.counts;
    info!(
        status = %manifest.status,
        chapters_processed = counts.chapters_processed,
        chapters_skipped = counts.chapters_skipped,
        parts_processed = counts.parts_processed,
        parts_failed = counts.parts_failed,
        documents_written = counts.documents_written,
        turns = counts.turns_total,
        speaker_lines = counts.speaker_lines_total,
        truncated_sections = counts.truncated_sections,
        warnings = counts.warnings_total,
        "extract completed"
    );

    Ok(())
}

struct ExtractJob<'a> {
    parser: &'a TranscriptParser,
    part_pattern: &'a Regex,
    cache_root: &'a Path,
    raw_dir: &'a Path,
    output_dir: &'a Path,
    dry_run: bool,
}

impl ExtractJob<'_> {
    fn extract_chapter(
        &self,
        chapter: &ChapterSpec,
        counts: &mut ExtractCounts,
        warnings: &mut Vec<String>,
    ) -> ChapterRunSummary {
        let rosters = match load_rosters(self.cache_root, chapter) {
            Ok(Some(rosters)) => rosters,
            Ok(None) => {
                let reason = "no roster entry for chapter".to_string();
                return skip_chapter(chapter, reason, counts, warnings);
            }
            Err(err) => return skip_chapter(chapter, format!("{err:#}"), counts, warnings),
        };

        let discovered =
            inventory::discover_parts(self.raw_dir, &chapter.file_identifier, self.part_pattern);
        let parts = match discovered {
            Ok(parts) if !parts.is_empty() => parts,
            Ok(_) => {
                let reason = "no HTML parts found".to_string();
                return skip_chapter(chapter, reason, counts, warnings);
            }
            Err(err) => return skip_chapter(chapter, format!("{err:#}"), counts, warnings),
        };

        counts.chapters_processed += 1;
        info!(
            chapter = %chapter.name,
            parts = parts.len(),
            evidences = rosters.evidences.len(),
            characters = rosters.characters.len(),
            "extracting chapter"
        );

        let mut state = ChapterState::new(&rosters);
        let mut summaries = Vec::with_capacity(parts.len());
        for entry in &parts {
            let part_index = state.next_part;
            let source_path = self.raw_dir.join(&entry.filename);

            let nodes = match self.read_part(&source_path) {
                Ok(nodes) => nodes,
                Err(err) => {
                    let message = format!("{err:#}");
                    warn!(
                        chapter = %chapter.name,
                        part = part_index,
                        error = %message,
                        "failed to read transcript part"
                    );
                    counts.parts_failed += 1;
                    warnings.push(format!("{} part {part_index}: {message}", chapter.name));
                    summaries.push(failed_part(part_index, entry, message));
                    state.next_part += 1;
                    continue;
                }
            };

            let (output, next_state) = self.parser.extract_part(&nodes, &rosters, state);
            state = next_state;

            let document = &output.document;
            let speaker_lines = document
                .turns
                .iter()
                .map(|turn| turn.speaker_lines.len())
                .sum::<usize>();
            if document.turns.is_empty() {
                info!(
                    chapter = %chapter.name,
                    part = part_index,
                    reason = "no interactive sections",
                    "part produced no turns"
                );
            }

            counts.parts_processed += 1;
            counts.turns_total += document.turns.len();
            counts.speaker_lines_total += speaker_lines;
            counts.turns_with_evidence += document
                .turns
                .iter()
                .filter(|turn| !turn.has_no_presentable_evidence)
                .count();
            counts.truncated_sections += output.truncated_sections;
            warnings.extend(
                output
                    .warnings
                    .iter()
                    .map(|warning| format!("{} part {part_index}: {warning}", chapter.name)),
            );

            let output_path = self
                .output_dir
                .join(output_file_name(chapter, output.part_index));
            let written = if self.dry_run {
                Ok(())
            } else {
                write_json_pretty(&output_path, document)
            };

            let (status, error) = match written {
                Ok(()) => {
                    if !self.dry_run {
                        counts.documents_written += 1;
                    }
                    debug!(
                        chapter = %chapter.name,
                        part = part_index,
                        path = %output_path.display(),
                        turns = document.turns.len(),
                        announced = output.announced.len(),
                        "part extracted"
                    );
                    ("completed", None)
                }
                Err(err) => {
                    let message = format!("{err:#}");
                    warn!(
                        chapter = %chapter.name,
                        part = part_index,
                        error = %message,
                        "failed to write chapter document"
                    );
                    counts.parts_failed += 1;
                    warnings.push(format!("{} part {part_index}: {message}", chapter.name));
                    ("failed", Some(message))
                }
            };

            summaries.push(PartRunSummary {
                part_index,
                source_file: entry.filename.clone(),
                source_hash: Some(entry.sha256.clone()),
                output_file: Some(output_path.display().to_string()),
                status: status.to_string(),
                turns: document.turns.len(),
                speaker_lines,
                previous_context_chars: document.previous_context.chars().count(),
                error,
            });
        }

        let remaining = state.ledger.remaining().count();
        if remaining > 0 {
            debug!(
                chapter = %chapter.name,
                remaining,
                "evidence never announced in any part"
            );
        }

        let failed = summaries.iter().any(|part| part.status == "failed");
        ChapterRunSummary {
            chapter: chapter.name.clone(),
            status: if failed {
                "completed_with_failures"
            } else {
                "completed"
            }
            .to_string(),
            reason: None,
            evidences_introduced: state.ledger.introduced_count(),
            parts: summaries,
        }
    }

    fn read_part(&self, path: &Path) -> Result<Vec<DocumentNode>> {
        let html = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        self.parser
            .flatten(&html)
            .with_context(|| format!("failed to flatten {}", path.display()))
    }
}

fn skip_chapter(
    chapter: &ChapterSpec,
    reason: String,
    counts: &mut ExtractCounts,
    warnings: &mut Vec<String>,
) -> ChapterRunSummary {
    warn!(chapter = %chapter.name, reason = %reason, "skipping chapter");
    counts.chapters_skipped += 1;
    warnings.push(format!("{} skipped: {reason}", chapter.name));
    ChapterRunSummary {
        chapter: chapter.name.clone(),
        status: "skipped".to_string(),
        reason: Some(reason),
        evidences_introduced: 0,
        parts: Vec::new(),
    }
}

fn failed_part(part_index: usize, entry: &HtmlPartEntry, message: String) -> PartRunSummary {
    PartRunSummary {
        part_index,
        source_file: entry.filename.clone(),
        source_hash: Some(entry.sha256.clone()),
        output_file: None,
        status: "failed".to_string(),
        turns: 0,
        speaker_lines: 0,
        previous_context_chars: 0,
        error: Some(message),
    }
}

pub(super) fn output_file_name(chapter: &ChapterSpec, part_index: usize) -> String {
    format!(
        "{}-{}_{}.json",
        chapter.output_prefix, part_index, chapter.file_identifier
    )
}

pub(super) fn select_chapters<'a>(
    chapters: &'a [ChapterSpec],
    filter: &[String],
) -> Result<Vec<&'a ChapterSpec>> {
    if filter.is_empty() {
        return Ok(chapters.iter().collect());
    }

    let wanted = filter
        .iter()
        .map(|name| normalize_chapter_name(name))
        .collect::<Vec<_>>();

    for (name, normalized) in filter.iter().zip(&wanted) {
        if !chapters
            .iter()
            .any(|chapter| normalize_chapter_name(&chapter.name) == *normalized)
        {
            bail!("unknown chapter requested: {name}");
        }
    }

    Ok(chapters
        .iter()
        .filter(|chapter| wanted.contains(&normalize_chapter_name(&chapter.name)))
        .collect())
}

pub(super) fn render_extract_command(args: &ExtractArgs) -> String {
    let mut command = vec![
        "turnabout".to_string(),
        "extract".to_string(),
        "--cache-root".to_string(),
        args.cache_root.display().to_string(),
    ];

    let optional_paths: [(&str, &Option<PathBuf>); 3] = [
        ("--chapters-path", &args.chapters_path),
        ("--output-dir", &args.output_dir),
        ("--run-manifest-path", &args.run_manifest_path),
    ];
    for (flag, path) in optional_paths {
        if let Some(path) = path {
            command.push(flag.to_string());
            command.push(path.display().to_string());
        }
    }
    for chapter in &args.chapters {
        command.push("--chapter".to_string());
        command.push(chapter.clone());
    }
    command.push("--content-selector".to_string());
    command.push(args.content_selector.clone());
    command.push("--truncated-sections".to_string());
    command.push(args.truncated_sections.as_str().to_string());
    if args.dry_run {
        command.push("--dry-run".to_string());
    }

    command.join(" ")
}
