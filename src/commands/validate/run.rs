use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::ValidateArgs;
use crate::model::ChapterDocument;
use crate::util::{list_json_files, now_utc_string, write_json_pretty};

use super::checks::{build_quality_checks, summarize_checks};
use super::{LoadedDocument, QualityCheck, QualityReport};

pub fn run(args: ValidateArgs) -> Result<()> {
    let manifest_dir = args.cache_root.join("manifests");
    let parsed_dir = args
        .parsed_dir
        .clone()
        .unwrap_or_else(|| args.cache_root.join("parsed_full_context"));
    let quality_report_path = args
        .quality_report_path
        .clone()
        .unwrap_or_else(|| manifest_dir.join("turn_quality_report.json"));

    let files = list_json_files(&parsed_dir)?;
    if files.is_empty() {
        warn!(dir = %parsed_dir.display(), "no chapter documents to validate");
    }

    let documents = files
        .iter()
        .map(|path| load_document(path))
        .collect::<Result<Vec<_>>>()?;

    let (checks, issues) = build_quality_checks(&documents)?;
    let summary = summarize_checks(&checks);
    let recommendations = recommendations_for(&checks);

    for check in checks.iter().filter(|check| check.result == "failed") {
        warn!(check_id = %check.check_id, name = %check.name, "quality check failed");
    }

    let report = QualityReport {
        manifest_version: 1,
        generated_at: now_utc_string(),
        status: if summary.failed > 0 {
            "failed".to_string()
        } else if summary.pending > 0 {
            "partial".to_string()
        } else {
            "passed".to_string()
        },
        parsed_dir: parsed_dir.display().to_string(),
        documents_total: documents.len(),
        summary,
        checks,
        issues,
        recommendations,
    };

    write_json_pretty(&quality_report_path, &report)?;
    info!(
        status = %report.status,
        passed = report.summary.passed,
        failed = report.summary.failed,
        pending = report.summary.pending,
        report_path = %quality_report_path.display(),
        "validation completed"
    );

    Ok(())
}

pub(super) fn load_document(path: &Path) -> Result<LoadedDocument> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(ToOwned::to_owned)
        .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

    let (raw, parsed) = match serde_json::from_str::<Value>(&text) {
        Ok(value) => {
            let parsed = serde_json::from_value::<ChapterDocument>(value.clone())
                .map_err(|err| err.to_string());
            (Some(value), parsed)
        }
        Err(err) => (None, Err(err.to_string())),
    };

    Ok(LoadedDocument {
        file_name,
        raw,
        parsed,
    })
}

fn recommendations_for(checks: &[QualityCheck]) -> Vec<String> {
    let failed = |check_id: &str| {
        checks
            .iter()
            .any(|check| check.check_id == check_id && check.result == "failed")
    };

    let mut recommendations = Vec::new();
    if failed("V-001") {
        recommendations
            .push("Re-run extract for documents that no longer match the chapter schema.".to_string());
    }
    if failed("V-002") || failed("V-003") {
        recommendations.push(
            "Re-run extract; noPresent and presentable evidence are derived during extraction."
                .to_string(),
        );
    }
    if failed("V-004") {
        recommendations.push(
            "Extract every part of a chapter in one run so carried context threads through all parts."
                .to_string(),
        );
    }
    if failed("V-005") {
        recommendations.push(
            "Keys outside the chapter schema are not written back; keep annotations in the raw JSON."
                .to_string(),
        );
    }
    if failed("V-006") {
        recommendations.push("Run normalize to rewrite legacy turn field names.".to_string());
    }
    recommendations
}
