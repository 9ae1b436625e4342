use std::fs;

use serde_json::{Value, json};

use super::LoadedDocument;
use super::checks::{build_quality_checks, summarize_checks};
use super::run::{load_document, run};
use crate::cli::ValidateArgs;
use crate::model::ChapterDocument;

fn document(previous_context: &str, turns: Value) -> Value {
    json!({
        "previousContext": previous_context,
        "characters": [{"name": "Phoenix Wright", "description1": "Defense attorney."}],
        "evidences": [{"name": "Attorney's Badge", "type": "Other", "obtained": "Start"}],
        "turns": turns
    })
}

fn loaded(file_name: &str, raw: Value) -> LoadedDocument {
    let parsed =
        serde_json::from_value::<ChapterDocument>(raw.clone()).map_err(|err| err.to_string());
    LoadedDocument {
        file_name: file_name.to_string(),
        raw: Some(raw),
        parsed,
    }
}

fn result_of<'a>(checks: &'a [super::QualityCheck], check_id: &str) -> &'a str {
    checks
        .iter()
        .find(|check| check.check_id == check_id)
        .map(|check| check.result.as_str())
        .unwrap_or("missing")
}

fn good_turn() -> Value {
    json!({
        "category": "cross_examination",
        "newContext": "The trial begins.",
        "testimonies": [
            {"testimony": "I was home.", "person": "Witness", "present": ["Attorney's Badge"]}
        ],
        "noPresent": false
    })
}

#[test]
fn consistent_chapter_passes_every_check() {
    let documents = vec![
        loaded("1-1_Turnabout_Test.json", document("", json!([good_turn()]))),
        loaded("1-2_Turnabout_Test.json", document("The trial begins.", json!([]))),
    ];

    let (checks, issues) = build_quality_checks(&documents).expect("checks run");
    let summary = summarize_checks(&checks);

    assert_eq!(summary.total_checks, 6);
    assert_eq!(summary.passed, 6);
    assert!(issues.is_empty());
}

#[test]
fn single_part_chapters_leave_context_check_pending() {
    let documents = vec![loaded(
        "1-1_Turnabout_Test.json",
        document("", json!([good_turn()])),
    )];

    let (checks, _) = build_quality_checks(&documents).expect("checks run");
    assert_eq!(result_of(&checks, "V-004"), "pending");
    assert_eq!(summarize_checks(&checks).pending, 1);
}

#[test]
fn invariant_violations_are_reported() {
    let wrong_flag = json!({
        "category": "rebuttal",
        "newContext": "",
        "testimonies": [{"testimony": "Hm.", "person": "Judge", "present": ["anything else"]}],
        "noPresent": true
    });
    let documents = vec![
        loaded("2-1_Turnabout_Sisters.json", document("Long context", json!([wrong_flag]))),
        loaded("2-2_Turnabout_Sisters.json", document("Short", json!([]))),
    ];

    let (checks, issues) = build_quality_checks(&documents).expect("checks run");

    assert_eq!(result_of(&checks, "V-001"), "pass");
    assert_eq!(result_of(&checks, "V-002"), "failed");
    assert_eq!(result_of(&checks, "V-003"), "failed");
    assert_eq!(result_of(&checks, "V-004"), "failed");
    assert!(
        issues
            .iter()
            .any(|issue| issue.starts_with("V-004: 2-2_Turnabout_Sisters.json"))
    );
}

#[test]
fn legacy_field_names_fail_canonical_check_but_still_parse() {
    let legacy_turn = json!({
        "category": "cross_examination",
        "new_context": "",
        "testimonies": [],
        "no_present": true
    });
    let documents = vec![loaded(
        "3-1_Turnabout_Samurai.json",
        document("", json!([legacy_turn])),
    )];

    let (checks, _) = build_quality_checks(&documents).expect("checks run");
    assert_eq!(result_of(&checks, "V-001"), "pass");
    assert_eq!(result_of(&checks, "V-006"), "failed");
}

#[test]
fn unmodelled_keys_fail_round_trip_check() {
    let mut annotated = document("", json!([good_turn()]));
    annotated["turns"][0]["labels"] = json!(["spatial"]);
    annotated["evidences"][0]["image"] = json!("badge.png");
    let documents = vec![loaded("4-1_Turnabout_Goodbyes.json", annotated)];

    let (checks, issues) = build_quality_checks(&documents).expect("checks run");

    assert_eq!(result_of(&checks, "V-001"), "pass");
    assert_eq!(result_of(&checks, "V-005"), "failed");
    let issue = issues
        .iter()
        .find(|issue| issue.starts_with("V-005"))
        .expect("round trip issue");
    assert!(issue.contains("$.turns[0].labels"));
    assert!(issue.contains("$.evidences[0].image"));
}

#[test]
fn legacy_keys_are_left_to_canonical_check() {
    let legacy_turn = json!({
        "category": "rebuttal",
        "new_context": "",
        "testimonies": [],
        "no_present": true
    });
    let documents = vec![loaded(
        "3-1_Turnabout_Samurai.json",
        document("", json!([legacy_turn])),
    )];

    let (checks, _) = build_quality_checks(&documents).expect("checks run");
    assert_eq!(result_of(&checks, "V-005"), "pass");
}

#[test]
fn non_json_files_fail_schema_check() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ not json").expect("write fixture");

    let document = load_document(&path).expect("file is readable");
    assert!(document.raw.is_none());
    assert!(document.parsed.is_err());

    let (checks, issues) = build_quality_checks(&[document]).expect("checks run");
    assert_eq!(result_of(&checks, "V-001"), "failed");
    assert_eq!(result_of(&checks, "V-002"), "pending");
    assert!(issues[0].starts_with("V-001: broken.json"));
}

#[test]
fn run_writes_quality_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    let parsed_dir = dir.path().join("parsed_full_context");
    fs::create_dir_all(&parsed_dir).expect("create parsed dir");
    fs::write(
        parsed_dir.join("1-1_Turnabout_Test.json"),
        document("", json!([good_turn()])).to_string(),
    )
    .expect("write part one");
    fs::write(
        parsed_dir.join("1-2_Turnabout_Test.json"),
        document("The trial begins.", json!([])).to_string(),
    )
    .expect("write part two");

    run(ValidateArgs {
        cache_root: dir.path().to_path_buf(),
        parsed_dir: None,
        quality_report_path: None,
    })
    .expect("validate should succeed");

    let raw = fs::read_to_string(dir.path().join("manifests").join("turn_quality_report.json"))
        .expect("report should exist");
    let report: Value = serde_json::from_str(&raw).expect("report parses");
    assert_eq!(report["status"], "passed");
    assert_eq!(report["documents_total"], 2);
    assert_eq!(report["summary"]["passed"], 6);
    assert_eq!(report["checks"][0]["check_id"], "V-001");
}
