use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::cli::NormalizeArgs;
use crate::model::ChapterDocument;
use crate::util::{list_json_files, read_json, write_json_pretty};

const LEGACY_TURN_FIELDS: &[(&str, &str)] = &[
    ("new_context", "newContext"),
    ("no_present", "noPresent"),
];

#[derive(Debug, Default, PartialEq, Eq)]
struct Rewrite {
    renamed: usize,
    conflicts: usize,
}

#[derive(Debug, Default)]
struct NormalizeCounts {
    files_total: usize,
    files_rewritten: usize,
    files_unchanged: usize,
    files_failed: usize,
    fields_renamed: usize,
    conflicts: usize,
}

pub fn run(args: NormalizeArgs) -> Result<()> {
    let parsed_dir = args
        .parsed_dir
        .clone()
        .unwrap_or_else(|| args.cache_root.join("parsed_full_context"));

    let files = list_json_files(&parsed_dir)?;
    info!(dir = %parsed_dir.display(), files = files.len(), "starting normalize");

    let mut counts = NormalizeCounts {
        files_total: files.len(),
        ..NormalizeCounts::default()
    };

    for path in &files {
        match normalize_file(path, args.dry_run) {
            Ok(None) => {
                counts.files_unchanged += 1;
                debug!(path = %path.display(), "already canonical");
            }
            Ok(Some(rewrite)) => {
                counts.files_rewritten += 1;
                counts.fields_renamed += rewrite.renamed;
                counts.conflicts += rewrite.conflicts;
                info!(
                    path = %path.display(),
                    renamed = rewrite.renamed,
                    conflicts = rewrite.conflicts,
                    dry_run = args.dry_run,
                    "canonicalized legacy field names"
                );
            }
            Err(err) => {
                counts.files_failed += 1;
                warn!(
                    path = %path.display(),
                    error = %format!("{err:#}"),
                    "failed to normalize document"
                );
            }
        }
    }

    info!(
        files = counts.files_total,
        rewritten = counts.files_rewritten,
        unchanged = counts.files_unchanged,
        failed = counts.files_failed,
        fields_renamed = counts.fields_renamed,
        conflicts = counts.conflicts,
        "normalize completed"
    );

    Ok(())
}

/// Rename legacy keys on the raw JSON and write it back, keeping every other
/// key. `Ok(None)` when the document already uses the canonical names.
fn normalize_file(path: &Path, dry_run: bool) -> Result<Option<Rewrite>> {
    let mut value: Value = read_json(path)?;
    let rewrite = canonicalize_document(&mut value)
        .with_context(|| format!("no turns array in {}", path.display()))?;
    if rewrite.renamed == 0 {
        return Ok(None);
    }

    serde_json::from_value::<ChapterDocument>(value.clone()).with_context(|| {
        format!(
            "document does not match the chapter schema: {}",
            path.display()
        )
    })?;

    if !dry_run {
        write_json_pretty(path, &value)?;
    }

    Ok(Some(rewrite))
}

fn canonicalize_document(document: &mut Value) -> Option<Rewrite> {
    let turns = document.get_mut("turns")?.as_array_mut()?;

    let mut rewrite = Rewrite::default();
    for (index, turn) in turns.iter_mut().enumerate() {
        let Some(turn) = turn.as_object_mut() else {
            continue;
        };
        let turn_rewrite = canonicalize_turn(turn);
        if turn_rewrite.conflicts > 0 {
            warn!(
                turn = index,
                "legacy and canonical fields differ; keeping the legacy value"
            );
        }
        rewrite.renamed += turn_rewrite.renamed;
        rewrite.conflicts += turn_rewrite.conflicts;
    }

    Some(rewrite)
}

fn canonicalize_turn(turn: &mut Map<String, Value>) -> Rewrite {
    let mut rewrite = Rewrite::default();
    for (legacy, canonical) in LEGACY_TURN_FIELDS {
        let Some(value) = turn.remove(*legacy) else {
            continue;
        };
        if turn
            .get(*canonical)
            .is_some_and(|existing| *existing != value)
        {
            rewrite.conflicts += 1;
        }
        turn.insert((*canonical).to_string(), value);
        rewrite.renamed += 1;
    }
    rewrite
}
