use std::collections::BTreeMap;

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;

use crate::model::ChapterDocument;
use crate::transcript::ANYTHING_ELSE;

use super::{LoadedDocument, QualityCheck, QualitySummary};

const LEGACY_TURN_KEYS: &[&str] = &["new_context", "no_present"];

#[derive(Debug, Default)]
struct Findings {
    evaluated: usize,
    violations: Vec<String>,
}

impl Findings {
    fn result(&self) -> &'static str {
        if self.evaluated == 0 {
            "pending"
        } else if self.violations.is_empty() {
            "pass"
        } else {
            "failed"
        }
    }
}

pub fn build_quality_checks(
    documents: &[LoadedDocument],
) -> Result<(Vec<QualityCheck>, Vec<String>)> {
    let series_pattern = Regex::new(r"^(.+)-(\d+)_(.+)\.json$")
        .context("failed to compile document name regex")?;

    let evaluated = [
        (
            "V-001",
            "Documents match the chapter schema",
            check_schema(documents),
        ),
        (
            "V-002",
            "noPresent matches speaker line evidence",
            check_no_present(documents),
        ),
        (
            "V-003",
            "No placeholder evidence choices",
            check_placeholder_evidence(documents),
        ),
        (
            "V-004",
            "Carried context extends across parts",
            check_carried_context(documents, &series_pattern),
        ),
        (
            "V-005",
            "Documents survive a typed round trip",
            check_round_trip(documents),
        ),
        (
            "V-006",
            "Turns use canonical field names",
            check_canonical_fields(documents),
        ),
    ];

    let mut checks = Vec::with_capacity(evaluated.len());
    let mut issues = Vec::new();
    for (check_id, name, findings) in evaluated {
        checks.push(QualityCheck {
            check_id: check_id.to_string(),
            name: name.to_string(),
            result: findings.result().to_string(),
        });
        issues.extend(
            findings
                .violations
                .into_iter()
                .map(|violation| format!("{check_id}: {violation}")),
        );
    }

    Ok((checks, issues))
}

pub fn summarize_checks(checks: &[QualityCheck]) -> QualitySummary {
    let passed = checks.iter().filter(|check| check.result == "pass").count();
    let failed = checks
        .iter()
        .filter(|check| check.result == "failed")
        .count();
    let pending = checks
        .iter()
        .filter(|check| check.result == "pending")
        .count();

    QualitySummary {
        total_checks: checks.len(),
        passed,
        failed,
        pending,
    }
}

fn parsed(documents: &[LoadedDocument]) -> impl Iterator<Item = (&str, &ChapterDocument)> {
    documents.iter().filter_map(|document| {
        document
            .parsed
            .as_ref()
            .ok()
            .map(|parsed| (document.file_name.as_str(), parsed))
    })
}

fn check_schema(documents: &[LoadedDocument]) -> Findings {
    Findings {
        evaluated: documents.len(),
        violations: documents
            .iter()
            .filter_map(|document| {
                document
                    .parsed
                    .as_ref()
                    .err()
                    .map(|err| format!("{}: {err}", document.file_name))
            })
            .collect(),
    }
}

fn check_no_present(documents: &[LoadedDocument]) -> Findings {
    let mut findings = Findings::default();
    for (file_name, document) in parsed(documents) {
        findings.evaluated += 1;
        for (index, turn) in document.turns.iter().enumerate() {
            let derived = turn
                .speaker_lines
                .iter()
                .all(|line| line.presentable_evidence.is_empty());
            if turn.has_no_presentable_evidence != derived {
                findings.violations.push(format!(
                    "{file_name} turn {index}: noPresent is {} but speaker lines say {derived}",
                    turn.has_no_presentable_evidence
                ));
            }
        }
    }
    findings
}

fn check_placeholder_evidence(documents: &[LoadedDocument]) -> Findings {
    let mut findings = Findings::default();
    for (file_name, document) in parsed(documents) {
        findings.evaluated += 1;
        for (index, turn) in document.turns.iter().enumerate() {
            let placeholder = turn.speaker_lines.iter().any(|line| {
                line.presentable_evidence
                    .iter()
                    .any(|name| name.trim().eq_ignore_ascii_case(ANYTHING_ELSE))
            });
            if placeholder {
                findings
                    .violations
                    .push(format!("{file_name} turn {index}: lists \"{ANYTHING_ELSE}\""));
            }
        }
    }
    findings
}

fn check_carried_context(documents: &[LoadedDocument], series_pattern: &Regex) -> Findings {
    let mut series: BTreeMap<String, Vec<(usize, &str, &ChapterDocument)>> = BTreeMap::new();
    for (file_name, document) in parsed(documents) {
        let Some(captures) = series_pattern.captures(file_name) else {
            continue;
        };
        let Ok(part) = captures[2].parse::<usize>() else {
            continue;
        };
        let key = format!("{}_{}", &captures[1], &captures[3]);
        series
            .entry(key)
            .or_default()
            .push((part, file_name, document));
    }

    let mut findings = Findings::default();
    for parts in series.values_mut() {
        if parts.len() < 2 {
            continue;
        }
        findings.evaluated += 1;
        parts.sort_by_key(|(part, _, _)| *part);
        for pair in parts.windows(2) {
            let (_, earlier_name, earlier) = pair[0];
            let (_, later_name, later) = pair[1];
            if !later.previous_context.starts_with(&earlier.previous_context) {
                findings.violations.push(format!(
                    "{later_name}: previousContext does not extend {earlier_name}"
                ));
            }
        }
    }
    findings
}

fn check_round_trip(documents: &[LoadedDocument]) -> Findings {
    let mut findings = Findings::default();
    for document in documents {
        let (Some(raw), Ok(parsed)) = (document.raw.as_ref(), document.parsed.as_ref()) else {
            continue;
        };
        findings.evaluated += 1;
        let encoded = match serde_json::to_value(parsed) {
            Ok(encoded) => encoded,
            Err(err) => {
                findings
                    .violations
                    .push(format!("{}: failed to re-encode: {err}", document.file_name));
                continue;
            }
        };
        let mut dropped = Vec::new();
        collect_dropped_keys(raw, &encoded, "$", &mut dropped);
        if !dropped.is_empty() {
            findings.violations.push(format!(
                "{}: round trip drops {}",
                document.file_name,
                dropped.join(", ")
            ));
        }
    }
    findings
}

fn collect_dropped_keys(raw: &Value, encoded: &Value, path: &str, dropped: &mut Vec<String>) {
    match (raw, encoded) {
        (Value::Object(raw), Value::Object(encoded)) => {
            for (key, value) in raw {
                if value.is_null() || LEGACY_TURN_KEYS.contains(&key.as_str()) {
                    continue;
                }
                let child = format!("{path}.{key}");
                match encoded.get(key) {
                    Some(kept) => collect_dropped_keys(value, kept, &child, dropped),
                    None => dropped.push(child),
                }
            }
        }
        (Value::Array(raw), Value::Array(encoded)) => {
            for (index, (value, kept)) in raw.iter().zip(encoded).enumerate() {
                collect_dropped_keys(value, kept, &format!("{path}[{index}]"), dropped);
            }
        }
        _ => {}
    }
}

fn check_canonical_fields(documents: &[LoadedDocument]) -> Findings {
    let mut findings = Findings::default();
    for document in documents {
        let Some(turns) = document
            .raw
            .as_ref()
            .and_then(|raw| raw.get("turns"))
            .and_then(|turns| turns.as_array())
        else {
            continue;
        };
        findings.evaluated += 1;
        let legacy = turns
            .iter()
            .filter_map(|turn| turn.as_object())
            .filter(|turn| LEGACY_TURN_KEYS.iter().any(|key| turn.contains_key(*key)))
            .count();
        if legacy > 0 {
            findings.violations.push(format!(
                "{}: {legacy} turns use legacy field names",
                document.file_name
            ));
        }
    }
    findings
}
