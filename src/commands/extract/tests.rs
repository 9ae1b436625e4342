use std::fs;
use std::path::{Path, PathBuf};

use super::run::{output_file_name, render_extract_command, run, select_chapters};
use crate::cli::{ExtractArgs, TruncatedSectionPolicy};
use crate::model::{ChapterDocument, ChapterSpec};

const CHAPTERS: &str = r#"{
  "manifest_version": 1,
  "chapters": [
    {
      "name": "Turnabout Test",
      "file_identifier": "Turnabout_Test",
      "output_prefix": "1",
      "evidence_roster": "evidence.json",
      "character_roster": "characters.json"
    },
    {
      "name": "Turnabout Missing",
      "file_identifier": "Turnabout_Missing",
      "output_prefix": "2",
      "evidence_roster": "evidence.json",
      "character_roster": "characters.json"
    }
  ]
}"#;

const EVIDENCE_ROSTER: &str = r#"[
  {
    "chapter": "Turnabout Test",
    "evidences": [
      {
        "currentChapter": "Turnabout Test",
        "name": "Attorney's Badge",
        "type": "Other",
        "obtained": "Start of chapter",
        "description1": "No one would believe I was a defense attorney without it."
      },
      {
        "currentChapter": "Turnabout Test",
        "name": "Autopsy Report",
        "type": "Evidence",
        "obtained": "From the prosecution",
        "description1": "Time of death: 9 PM.",
        "description2": "Cause of death: blunt force trauma."
      }
    ]
  }
]"#;

const CHARACTER_ROSTER: &str = r#"[
  {
    "chapter": "Turnabout Test",
    "characters": [
      {
        "currentChapter": "Turnabout Test",
        "name": "Phoenix Wright",
        "age": "24",
        "gender": "Male",
        "description1": "A rookie defense attorney."
      }
    ]
  }
]"#;

const PART_ONE: &str = r#"<html><body><div class="mw-parser-output">
<p>The trial begins.</p>
<p><span style="color:#0070C0">Autopsy Report added to the Court Record.</span></p>
<center><span style="color:red">Cross Examination</span></center>
<hr>
<p><span style="color:green">Witness: I was home all night.</span></p>
<table><tr><th class="navbox1title">Present <a href="/wiki/Autopsy_Report">Autopsy Report</a></th></tr></table>
<hr>
</div></body></html>"#;

const PART_TWO: &str = r#"<html><body><div class="mw-parser-output">
<p>Recess.</p>
</div></body></html>"#;

fn write_fixture(root: &Path) {
    let files = [
        ("manifests/chapters.json", CHAPTERS),
        ("objects_parsed/evidence.json", EVIDENCE_ROSTER),
        ("characters_parsed/characters.json", CHARACTER_ROSTER),
        ("raw/Turnabout_Test_-_Part_1.html", PART_ONE),
        ("raw/Turnabout_Test_-_Part_2.html", PART_TWO),
    ];
    for (relative, contents) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture directory");
        }
        fs::write(path, contents).expect("write fixture file");
    }
}

fn extract_args(cache_root: &Path) -> ExtractArgs {
    ExtractArgs {
        cache_root: cache_root.to_path_buf(),
        chapters_path: None,
        output_dir: None,
        run_manifest_path: Some(cache_root.join("manifests").join("extract_run_test.json")),
        chapters: Vec::new(),
        content_selector: ".mw-parser-output".to_string(),
        truncated_sections: TruncatedSectionPolicy::Keep,
        dry_run: false,
    }
}

fn read_document(path: PathBuf) -> ChapterDocument {
    let raw = fs::read_to_string(&path).expect("document should exist");
    serde_json::from_str(&raw).expect("document should parse")
}

fn chapter(name: &str) -> ChapterSpec {
    ChapterSpec {
        name: name.to_string(),
        file_identifier: name.replace(' ', "_"),
        output_prefix: "3".to_string(),
        evidence_roster: "evidence.json".to_string(),
        character_roster: "characters.json".to_string(),
    }
}

#[test]
fn run_writes_one_document_per_part_and_threads_context() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixture(dir.path());

    run(extract_args(dir.path())).expect("extract should succeed");

    let output_dir = dir.path().join("parsed_full_context");
    let first = read_document(output_dir.join("1-1_Turnabout_Test.json"));
    let second = read_document(output_dir.join("1-2_Turnabout_Test.json"));

    assert_eq!(first.previous_context, "");
    assert_eq!(first.characters.len(), 1);
    assert_eq!(first.characters[0].name, "Phoenix Wright");
    assert_eq!(first.evidences.len(), 1);
    assert_eq!(first.evidences[0].name, "Attorney's Badge");
    assert_eq!(first.turns.len(), 1);
    assert_eq!(
        first.turns[0].context_snapshot,
        "The trial begins.\nAutopsy Report added to the Court Record."
    );
    assert_eq!(first.turns[0].speaker_lines[0].person, "Witness");
    assert_eq!(
        first.turns[0].speaker_lines[0].presentable_evidence,
        vec!["Autopsy Report".to_string()]
    );
    assert!(!first.turns[0].has_no_presentable_evidence);

    assert_eq!(
        second.previous_context,
        "The trial begins.\nAutopsy Report added to the Court Record."
    );
    assert_eq!(second.evidences.len(), 2);
    assert_eq!(
        second.evidences[1].description_parts.0,
        vec![
            "Time of death: 9 PM.".to_string(),
            "Cause of death: blunt force trauma.".to_string()
        ]
    );
    assert!(second.turns.is_empty());
}

#[test]
fn run_manifest_records_skipped_chapters_and_counts() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixture(dir.path());

    run(extract_args(dir.path())).expect("extract should succeed");

    let raw = fs::read_to_string(dir.path().join("manifests").join("extract_run_test.json"))
        .expect("run manifest should exist");
    let manifest: serde_json::Value = serde_json::from_str(&raw).expect("manifest parses");

    assert_eq!(manifest["status"], "completed");
    assert_eq!(manifest["truncated_section_policy"], "keep");
    assert_eq!(manifest["counts"]["chapters_total"], 2);
    assert_eq!(manifest["counts"]["chapters_processed"], 1);
    assert_eq!(manifest["counts"]["chapters_skipped"], 1);
    assert_eq!(manifest["counts"]["parts_processed"], 2);
    assert_eq!(manifest["counts"]["documents_written"], 2);
    assert_eq!(manifest["counts"]["turns_total"], 1);
    assert_eq!(manifest["counts"]["turns_with_evidence"], 1);

    let chapters = manifest["chapters"].as_array().expect("chapters array");
    assert_eq!(chapters[0]["evidences_introduced"], 1);
    assert_eq!(chapters[0]["parts"][0]["source_file"], "Turnabout_Test_-_Part_1.html");
    assert_eq!(chapters[1]["status"], "skipped");
    assert_eq!(chapters[1]["reason"], "no roster entry for chapter");
}

#[test]
fn dry_run_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixture(dir.path());

    let mut args = extract_args(dir.path());
    args.dry_run = true;
    run(args).expect("dry run should succeed");

    assert!(!dir.path().join("parsed_full_context").exists());
    assert!(
        !dir.path()
            .join("manifests")
            .join("extract_run_test.json")
            .exists()
    );
}

#[test]
fn unreadable_part_is_recorded_and_later_parts_keep_their_index() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixture(dir.path());
    fs::write(
        dir.path().join("raw").join("Turnabout_Test_-_Part_1.html"),
        "<html><body><p>no container</p></body></html>",
    )
    .expect("overwrite part one");

    let mut args = extract_args(dir.path());
    args.chapters = vec!["Turnabout Test".to_string()];
    run(args).expect("extract should still succeed");

    let output_dir = dir.path().join("parsed_full_context");
    assert!(!output_dir.join("1-1_Turnabout_Test.json").exists());
    let second = read_document(output_dir.join("1-2_Turnabout_Test.json"));
    assert_eq!(second.previous_context, "");

    let raw = fs::read_to_string(dir.path().join("manifests").join("extract_run_test.json"))
        .expect("run manifest should exist");
    let manifest: serde_json::Value = serde_json::from_str(&raw).expect("manifest parses");
    assert_eq!(manifest["status"], "completed_with_failures");
    assert_eq!(manifest["counts"]["parts_failed"], 1);
    assert_eq!(manifest["chapters"][0]["parts"][0]["status"], "failed");
}

#[test]
fn select_chapters_matches_normalized_names_and_rejects_unknown() {
    let chapters = vec![chapter("Turnabout Sisters"), chapter("Turnabout Samurai")];

    let all = select_chapters(&chapters, &[]).expect("no filter");
    assert_eq!(all.len(), 2);

    let one = select_chapters(&chapters, &["Turnabout\u{a0}Samurai".to_string()])
        .expect("known chapter");
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].name, "Turnabout Samurai");

    assert!(select_chapters(&chapters, &["Turnabout Goodbyes".to_string()]).is_err());
}

#[test]
fn output_file_name_uses_prefix_part_and_identifier() {
    assert_eq!(
        output_file_name(&chapter("Turnabout Sisters"), 4),
        "3-4_Turnabout_Sisters.json"
    );
}

#[test]
fn render_extract_command_includes_filters_and_policy() {
    let mut args = extract_args(Path::new(".cache/turnabout"));
    args.chapters = vec!["Turnabout Sisters".to_string()];
    args.truncated_sections = TruncatedSectionPolicy::Discard;

    let command = render_extract_command(&args);
    assert!(command.starts_with("turnabout extract --cache-root .cache/turnabout"));
    assert!(command.contains("--chapter Turnabout Sisters"));
    assert!(command.contains("--truncated-sections discard"));
    assert!(command.contains("--run-manifest-path"));
    assert!(!command.contains("--dry-run"));
}
