use serde::Serialize;
use serde_json::Value;

use crate::model::ChapterDocument;

mod checks;
mod run;
#[cfg(test)]
mod tests;

pub use run::run;

#[derive(Debug, Serialize)]
struct QualityReport {
    manifest_version: u32,
    generated_at: String,
    status: String,
    parsed_dir: String,
    documents_total: usize,
    summary: QualitySummary,
    checks: Vec<QualityCheck>,
    issues: Vec<String>,
    recommendations: Vec<String>,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
struct QualitySummary {
    total_checks: usize,
    passed: usize,
    failed: usize,
    pending: usize,
}

#[derive(Debug, Serialize, Clone)]
struct QualityCheck {
    check_id: String,
    name: String,
    result: String,
}

#[derive(Debug)]
struct LoadedDocument {
    file_name: String,
    raw: Option<Value>,
    parsed: Result<ChapterDocument, String>,
}
