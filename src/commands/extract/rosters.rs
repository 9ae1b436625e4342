use std::path::Path;

use anyhow::Result;
use tracing::debug;

use crate::model::{ChapterCharacterRoster, ChapterEvidenceRoster, ChapterSpec};
use crate::transcript::{ChapterRosters, normalize_chapter_name};
use crate::util::read_json;

/// Load both rosters of `chapter`. `Ok(None)` when either roster file has no
/// entry for the chapter.
pub fn load_rosters(cache_root: &Path, chapter: &ChapterSpec) -> Result<Option<ChapterRosters>> {
    let evidence_path = cache_root
        .join("objects_parsed")
        .join(&chapter.evidence_roster);
    let character_path = cache_root
        .join("characters_parsed")
        .join(&chapter.character_roster);

    let evidence_entries: Vec<ChapterEvidenceRoster> = read_json(&evidence_path)?;
    let character_entries: Vec<ChapterCharacterRoster> = read_json(&character_path)?;

    let Some(evidences) = find_chapter(&evidence_entries, &chapter.name, |entry| &entry.chapter)
    else {
        debug!(path = %evidence_path.display(), "evidence roster has no entry for chapter");
        return Ok(None);
    };
    let Some(characters) =
        find_chapter(&character_entries, &chapter.name, |entry| &entry.chapter)
    else {
        debug!(path = %character_path.display(), "character roster has no entry for chapter");
        return Ok(None);
    };

    Ok(Some(ChapterRosters {
        chapter: chapter.name.clone(),
        characters: characters.characters.clone(),
        evidences: evidences.evidences.clone(),
    }))
}

pub fn find_chapter<'a, T>(
    entries: &'a [T],
    chapter: &str,
    name_of: impl Fn(&T) -> &String,
) -> Option<&'a T> {
    let wanted = normalize_chapter_name(chapter);
    entries
        .iter()
        .find(|entry| normalize_chapter_name(name_of(entry)) == wanted)
}
