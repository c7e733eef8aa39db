//! Turn discovered (title, url) pairs into dataset rows.
//!
//! The crawl that discovers links runs elsewhere and emits a JSON-lines feed,
//! one `{"name": ..., "url": ...}` object per line. Titles look like
//! `"강남도서관 장서 대출목록 (2023년 4월)"`.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::row::Row;

/// Site origin prepended to relative download links
pub const DEFAULT_URL_PREFIX: &str = "https://www.data4library.kr";

/// Directory (relative to the dataset) holding per-library files
pub const SAVE_ROOT: &str = "./도서관별";

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<library>.+) (?:장서 대출목록|장서/대출목록|장서목록) \((?P<year>\d+)년 (?P<month>\d+)월\)")
        .expect("invalid title pattern")
});

/// One discovered link
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedEntry {
    pub name: String,
    pub url: String,
}

/// Library, year and month parsed from a dataset title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title {
    pub library: String,
    pub year: i32,
    pub month: u32,
}

/// Parse a published dataset title. `None` if it does not match, the
/// month is out of range, or the library name is not a single path component.
pub fn parse_title(name: &str) -> Option<Title> {
    let caps = TITLE_RE.captures(name)?;
    let library = caps.name("library")?.as_str().trim().to_string();
    let year = caps.name("year")?.as_str().parse().ok()?;
    let month = caps.name("month")?.as_str().parse().ok()?;
    if !is_path_component(&library) || !(1..=12).contains(&month) {
        return None;
    }
    Some(Title {
        library,
        year,
        month,
    })
}

/// Library names become a directory under [`SAVE_ROOT`].
fn is_path_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Destination path for one library-month, relative to the dataset file.
pub fn save_path(library: &str, year: i32, month: u32) -> String {
    format!("{SAVE_ROOT}/{library}/{year}-{month:02}.csv")
}

/// Read a JSON-lines feed. Blank lines are skipped; a malformed line is an error.
pub fn read_feed(reader: impl BufRead) -> std::io::Result<Vec<FeedEntry>> {
    let mut entries = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(&line).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("feed line {}: {e}", lineno + 1),
            )
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Build dataset rows from feed entries.
///
/// Titles that do not parse are skipped with a warning. Entries that map to
/// the same `SaveAt` keep the last url seen. Rows come out sorted by
/// `SaveAt`, every url marked valid.
pub fn build_rows(entries: impl IntoIterator<Item = FeedEntry>, url_prefix: &str) -> Vec<Row> {
    let mut by_path: BTreeMap<String, (String, Row)> = BTreeMap::new();
    for FeedEntry { name, url } in entries {
        let Some(title) = parse_title(&name) else {
            log::warn!("Skipping unrecognized title: {name:?}");
            continue;
        };
        let save_at = save_path(&title.library, title.year, title.month);
        let row = Row {
            save_at: save_at.clone(),
            source_name: title.library,
            year: title.year,
            month: title.month,
            url: absolute_url(&url, url_prefix),
            valid_url: true,
        };
        if let Some((previous, _)) = by_path.insert(save_at.clone(), (name.clone(), row)) {
            log::warn!("{name:?} replaces {previous:?} for {save_at}");
        }
    }

    // BTreeMap order is SaveAt order
    by_path.into_values().map(|(_, row)| row).collect()
}

fn absolute_url(url: &str, prefix: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("{}{url}", prefix.trim_end_matches('/'))
    }
}
