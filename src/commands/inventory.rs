use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::{info, warn};

use crate::cli::InventoryArgs;
use crate::model::{ChapterManifest, HtmlInventoryManifest, HtmlPartEntry, InventoryChapter};
use crate::util::{now_utc_string, read_json, sha256_file, write_json_pretty};

const BUNDLED_CHAPTERS: &str = include_str!("../../manifests/chapters.json");
const BUNDLED_CHAPTERS_SOURCE: &str = "bundled:manifests/chapters.json";

pub fn run(args: InventoryArgs) -> Result<()> {
    let (chapters, _) =
        resolve_chapter_manifest(args.chapters_path.as_deref(), &args.cache_root)?;
    let manifest = build_manifest(&args.cache_root.join("raw"), &chapters)?;

    if args.dry_run {
        info!(
            part_count = manifest.part_count,
            chapters = manifest.chapters.len(),
            source = %manifest.source_directory,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args.manifest_path.unwrap_or_else(|| {
        args.cache_root
            .join("manifests")
            .join("html_inventory.json")
    });

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(part_count = manifest.part_count, "inventory completed");

    Ok(())
}

fn default_chapters_path(cache_root: &Path) -> PathBuf {
    cache_root.join("manifests").join("chapters.json")
}

pub fn resolve_chapter_manifest(
    explicit: Option<&Path>,
    cache_root: &Path,
) -> Result<(ChapterManifest, String)> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => default_chapters_path(cache_root),
    };
    if explicit.is_some() || path.is_file() {
        let manifest = load_chapter_manifest(&path)?;
        return Ok((manifest, path.display().to_string()));
    }

    info!(path = %path.display(), "no chapter manifest in cache root, using bundled chapters");
    let manifest: ChapterManifest = serde_json::from_str(BUNDLED_CHAPTERS)
        .context("failed to parse bundled chapter manifest")?;
    Ok((manifest, BUNDLED_CHAPTERS_SOURCE.to_string()))
}

pub fn load_chapter_manifest(path: &Path) -> Result<ChapterManifest> {
    let manifest: ChapterManifest = read_json(path)
        .with_context(|| format!("failed to load chapter manifest: {}", path.display()))?;
    if manifest.chapters.is_empty() {
        bail!("chapter manifest lists no chapters: {}", path.display());
    }
    Ok(manifest)
}

pub fn build_manifest(raw_dir: &Path, chapters: &ChapterManifest) -> Result<HtmlInventoryManifest> {
    let pattern = part_number_pattern()?;

    let mut inventory = Vec::with_capacity(chapters.chapters.len());
    for chapter in &chapters.chapters {
        let parts = discover_parts(raw_dir, &chapter.file_identifier, &pattern)?;
        if parts.is_empty() {
            warn!(
                chapter = %chapter.name,
                identifier = %chapter.file_identifier,
                "no HTML parts found for chapter"
            );
        }
        inventory.push(InventoryChapter {
            chapter: chapter.name.clone(),
            file_identifier: chapter.file_identifier.clone(),
            parts,
        });
    }

    let part_count = inventory.iter().map(|chapter| chapter.parts.len()).sum();
    if part_count == 0 {
        bail!("no HTML transcript parts found in {}", raw_dir.display());
    }

    Ok(HtmlInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: raw_dir.display().to_string(),
        part_count,
        chapters: inventory,
    })
}

pub fn part_number_pattern() -> Result<Regex> {
    Regex::new(r"(\d+)\.html?$").context("failed to compile part number regex")
}

pub fn discover_parts(
    raw_dir: &Path,
    identifier: &str,
    pattern: &Regex,
) -> Result<Vec<HtmlPartEntry>> {
    let mut parts = Vec::new();

    let entries =
        fs::read_dir(raw_dir).with_context(|| format!("failed to read {}", raw_dir.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", raw_dir.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;

        let is_html = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
            .unwrap_or(false);

        if !is_html || !filename.starts_with(identifier) {
            continue;
        }

        let part = parse_part_number(&filename, pattern);
        let sha256 = sha256_file(&path)?;
        parts.push(HtmlPartEntry {
            filename,
            part,
            sha256,
        });
    }

    parts.sort_by(|a, b| {
        a.part
            .unwrap_or(u32::MAX)
            .cmp(&b.part.unwrap_or(u32::MAX))
            .then(a.filename.cmp(&b.filename))
    });

    Ok(parts)
}

fn parse_part_number(filename: &str, pattern: &Regex) -> Option<u32> {
    pattern
        .captures(filename)?
        .get(1)?
        .as_str()
        .parse::<u32>()
        .ok()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{
        BUNDLED_CHAPTERS_SOURCE, discover_parts, parse_part_number, part_number_pattern,
        resolve_chapter_manifest,
    };

    #[test]
    fn parse_part_number_reads_trailing_digits() {
        let pattern = part_number_pattern().expect("pattern should compile");
        assert_eq!(
            parse_part_number("Turnabout_Sisters_-_Transcript_-_Part_12.html", &pattern),
            Some(12)
        );
        assert_eq!(parse_part_number("Turnabout_Sisters.html", &pattern), None);
    }

    #[test]
    fn discover_parts_filters_by_identifier_and_sorts_numerically() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in [
            "Turnabout_Sisters_-_Part_10.html",
            "Turnabout_Sisters_-_Part_2.html",
            "Turnabout_Sisters_-_Part_1.html",
            "Turnabout_Samurai_-_Part_1.html",
            "Turnabout_Sisters_notes.txt",
        ] {
            fs::write(dir.path().join(name), "<html></html>").expect("write fixture");
        }

        let pattern = part_number_pattern().expect("pattern should compile");
        let parts =
            discover_parts(dir.path(), "Turnabout_Sisters", &pattern).expect("parts discovered");

        let names = parts
            .iter()
            .map(|part| part.filename.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "Turnabout_Sisters_-_Part_1.html",
                "Turnabout_Sisters_-_Part_2.html",
                "Turnabout_Sisters_-_Part_10.html",
            ]
        );
        assert_eq!(parts[0].part, Some(1));
        assert_eq!(parts[0].sha256.len(), 64);
    }

    #[test]
    fn bundled_chapters_are_used_without_a_cache_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");

        let (manifest, source) =
            resolve_chapter_manifest(None, dir.path()).expect("bundled manifest loads");

        assert_eq!(source, BUNDLED_CHAPTERS_SOURCE);
        assert_eq!(manifest.chapters.len(), 29);
        let first = &manifest.chapters[0];
        assert_eq!(first.name, "The First Turnabout");
        assert_eq!(first.output_prefix, "1-1");
        assert!(
            manifest
                .chapters
                .iter()
                .all(|chapter| chapter.evidence_roster.starts_with("List_of_Evidence_in_"))
        );
    }

    #[test]
    fn cache_manifest_overrides_bundled_chapters() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manifests = dir.path().join("manifests");
        fs::create_dir_all(&manifests).expect("create manifests dir");
        fs::write(
            manifests.join("chapters.json"),
            r#"{"manifest_version": 1, "chapters": [{"name": "Turnabout Test", "file_identifier": "Turnabout_Test", "output_prefix": "9-1", "evidence_roster": "e.json", "character_roster": "c.json"}]}"#,
        )
        .expect("write manifest");

        let (manifest, source) =
            resolve_chapter_manifest(None, dir.path()).expect("cache manifest loads");
        assert_eq!(manifest.chapters.len(), 1);
        assert!(source.ends_with("chapters.json"));
        assert_ne!(source, BUNDLED_CHAPTERS_SOURCE);
    }

    #[test]
    fn explicit_manifest_path_must_exist() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.json");
        assert!(resolve_chapter_manifest(Some(&missing), dir.path()).is_err());
    }
}
