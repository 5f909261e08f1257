//! Row-set ingestion from a local CSV export or a spreadsheet URL.
//!
//! Only the header row and a handful of semantic columns are located; every
//! cell stays a string.

use std::path::{Path, PathBuf};

use batch_types::{ColumnRoles, Row};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::LoadError;
use crate::orchestrator::available_groups;
use crate::transport::Transport;

/// How many leading lines may precede the header row.
pub const HEADER_SCAN_LINES: usize = 50;
const MIN_SHEETS_EXPORT_LEN: usize = 100;

static SHEET_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/spreadsheets/d/([a-zA-Z0-9_-]+)").expect("valid sheet id pattern")
});
static SHEET_GID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&#]gid=([0-9]+)").expect("valid gid pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    File(PathBuf),
    Url(String),
}

impl ManifestSource {
    /// Classify operator input; pasted paths may carry surrounding quotes.
    pub fn parse(input: &str) -> Self {
        let input = strip_quotes(input.trim());
        let lower = input.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(input.to_string())
        } else {
            Self::File(PathBuf::from(input))
        }
    }
}

/// Strip one pair of matching surrounding quotes.
pub fn strip_quotes(input: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = input
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    input
}

/// Loaded rows plus the column roles and groups found in them.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub rows: Vec<Row>,
    pub columns: ColumnRoles,
    /// Groups in first-appearance order, counting only rows with a link.
    pub groups: Vec<String>,
}

pub async fn load(source: &ManifestSource, transport: &dyn Transport) -> Result<Manifest, LoadError> {
    let text = match source {
        ManifestSource::File(path) => read_local(path).await?,
        ManifestSource::Url(url) => download(url, transport).await?,
    };
    let manifest = parse_manifest(&text)?;
    tracing::info!(
        rows = manifest.rows.len(),
        groups = manifest.groups.len(),
        name_column = %manifest.columns.name,
        link_column = %manifest.columns.link,
        "manifest loaded"
    );
    Ok(manifest)
}

async fn read_local(path: &Path) -> Result<String, LoadError> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })
}

async fn download(url: &str, transport: &dyn Transport) -> Result<String, LoadError> {
    let lower = url.to_ascii_lowercase();
    let is_sheet = lower.contains("docs.google.com/spreadsheets");
    let export_url = if lower.contains("googleusercontent.com") && lower.contains("format=csv") {
        url.to_string()
    } else if is_sheet {
        sheets_export_url(url).ok_or_else(|| LoadError::Download {
            url: url.to_string(),
            reason: "invalid Google Sheets URL format".to_string(),
        })?
    } else {
        url.to_string()
    };

    let failed = |reason: String| LoadError::Download {
        url: export_url.clone(),
        reason,
    };
    let resp = transport
        .get(&export_url)
        .await
        .map_err(|err| failed(err.to_string()))?;
    if !resp.is_success() {
        return Err(failed(format!("HTTP {}", resp.status)));
    }
    let bytes = resp.into_bytes().await.map_err(|err| failed(err.to_string()))?;
    let text = String::from_utf8_lossy(&bytes).into_owned();
    if text.trim().is_empty() || (is_sheet && text.len() <= MIN_SHEETS_EXPORT_LEN) {
        return Err(failed("received empty or invalid content".to_string()));
    }
    Ok(text)
}

/// CSV export URL for a Google Sheets link; `gid` defaults to the first sheet.
pub fn sheets_export_url(url: &str) -> Option<String> {
    let id = SHEET_ID_RE.captures(url)?.get(1)?.as_str().to_string();
    let gid = SHEET_GID_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|gid| gid.as_str())
        .unwrap_or("0");
    Some(format!(
        "https://docs.google.com/spreadsheets/d/{id}/export?format=csv&gid={gid}"
    ))
}

/// Parse CSV text into a manifest.
pub fn parse_manifest(text: &str) -> Result<Manifest, LoadError> {
    let text = text.trim_start_matches('\u{feff}');
    let offset = header_offset(text).ok_or(LoadError::NoHeaderRow(HEADER_SCAN_LINES))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text[offset..].as_bytes());
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();

    let name = ["songs", "name", "title"]
        .into_iter()
        .find_map(|keyword| find_column(&headers, keyword));
    let link = find_column(&headers, "link");
    let group = find_exact_column(&headers, "era").or_else(|| find_column(&headers, "era"));
    let (Some(name), Some(link), Some(group)) = (name, link, group) else {
        return Err(LoadError::MissingColumns { available: headers });
    };
    let length = find_column(&headers, "available length");
    let quality = find_column(&headers, "quality");

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cell = |idx: usize| {
            record
                .get(idx)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        rows.push(Row {
            name: cell(name).unwrap_or_default(),
            link: cell(link),
            group: cell(group),
            availability: length.and_then(cell),
            quality: quality.and_then(cell),
        });
    }

    let groups = available_groups(&rows);
    if groups.is_empty() {
        return Err(LoadError::NoGroups);
    }
    let columns = ColumnRoles {
        group: headers[group].clone(),
        name: headers[name].clone(),
        link: headers[link].clone(),
        length: length.map(|idx| headers[idx].clone()),
        quality: quality.map(|idx| headers[idx].clone()),
    };
    Ok(Manifest {
        rows,
        columns,
        groups,
    })
}

/// Byte offset of the first line that is neither blank nor only commas.
fn header_offset(text: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n').take(HEADER_SCAN_LINES) {
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.chars().all(|c| c == ',') {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

fn squash(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// First column whose squashed name (or its singular) contains `keyword`.
fn find_column(columns: &[String], keyword: &str) -> Option<usize> {
    let keyword = squash(keyword);
    columns.iter().position(|column| {
        let column = squash(column);
        let singular = match column.strip_suffix('s') {
            Some(stem) if !keyword.ends_with('s') => stem,
            _ => column.as_str(),
        };
        column.contains(&keyword) || singular.contains(&keyword)
    })
}

fn find_exact_column(columns: &[String], keyword: &str) -> Option<usize> {
    let keyword = squash(keyword);
    columns.iter().position(|column| squash(column) == keyword)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::tests::temp_dir;
    use crate::transport::fake::{FakeReply, FakeTransport};

    const SHEET: &str = "\
,,,,,
,,,,,
Era,Name,Notes,Track Length,Available Length,Quality,Link(s)
Era A,\"Drake - Song (prod. X)\",,3:10,Full,CD Quality,https://pillowcase.su/f/a1
Era A,Other,,2:00,Snippet,,https://music.froste.lol/song/b2
Era B,No Link Yet,,,,,
Era C,Thing,,,,Low Quality,https://pillowcase.su/f/c3
";

    #[test]
    fn finds_header_after_comma_only_lines() {
        let manifest = parse_manifest(SHEET).unwrap();
        assert_eq!(manifest.columns.group, "Era");
        assert_eq!(manifest.columns.name, "Name");
        assert_eq!(manifest.columns.link, "Link(s)");
        assert_eq!(manifest.columns.length.as_deref(), Some("Available Length"));
        assert_eq!(manifest.columns.quality.as_deref(), Some("Quality"));
        assert_eq!(manifest.rows.len(), 4);
        assert_eq!(manifest.groups, vec!["Era A", "Era C"]);

        let first = &manifest.rows[0];
        assert_eq!(first.name, "Drake - Song (prod. X)");
        assert_eq!(first.availability.as_deref(), Some("Full"));
        assert_eq!(manifest.rows[2].link, None);
        assert_eq!(manifest.rows[3].quality.as_deref(), Some("Low Quality"));
    }

    #[test]
    fn songs_column_wins_over_title() {
        let text = "Title,Songs,Era,Link\nt,s,E,https://pillowcase.su/f/x\n";
        let manifest = parse_manifest(text).unwrap();
        assert_eq!(manifest.columns.name, "Songs");
        assert_eq!(manifest.rows[0].name, "s");
    }

    #[test]
    fn singular_keyword_matches_plural_column() {
        let columns = vec!["Names".to_string(), "Links".to_string()];
        assert_eq!(find_column(&columns, "name"), Some(0));
        assert_eq!(find_column(&columns, "link"), Some(1));
        assert_eq!(find_column(&columns, "quality"), None);
    }

    #[test]
    fn missing_columns_lists_what_was_found() {
        let err = parse_manifest("Era,Notes\nA,x\n").unwrap_err();
        match err {
            LoadError::MissingColumns { available } => assert_eq!(available, vec!["Era", "Notes"]),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn blank_input_has_no_header_row() {
        assert!(matches!(
            parse_manifest(",,,\n\n   \n"),
            Err(LoadError::NoHeaderRow(HEADER_SCAN_LINES))
        ));
    }

    #[test]
    fn rows_without_links_yield_no_groups() {
        assert!(matches!(
            parse_manifest("Era,Name,Link\nA,x,\nB,y,  \n"),
            Err(LoadError::NoGroups)
        ));
    }

    #[test]
    fn source_parsing_strips_quotes() {
        assert_eq!(
            ManifestSource::parse("  \"/tmp/my sheet.csv\" "),
            ManifestSource::File(PathBuf::from("/tmp/my sheet.csv"))
        );
        assert_eq!(
            ManifestSource::parse("https://docs.google.com/spreadsheets/d/abc/edit"),
            ManifestSource::Url("https://docs.google.com/spreadsheets/d/abc/edit".to_string())
        );
    }

    #[test]
    fn sheets_links_become_csv_exports() {
        assert_eq!(
            sheets_export_url("https://docs.google.com/spreadsheets/d/1AbC_-9/edit#gid=42").as_deref(),
            Some("https://docs.google.com/spreadsheets/d/1AbC_-9/export?format=csv&gid=42")
        );
        assert_eq!(
            sheets_export_url("https://docs.google.com/spreadsheets/d/xyz/edit").as_deref(),
            Some("https://docs.google.com/spreadsheets/d/xyz/export?format=csv&gid=0")
        );
        assert_eq!(sheets_export_url("https://docs.google.com/spreadsheets/"), None);
    }

    #[tokio::test]
    async fn loads_local_file() {
        let dir = temp_dir("manifest-local");
        let path = dir.join("sheet.csv");
        std::fs::write(&path, SHEET).unwrap();

        let manifest = load(&ManifestSource::File(path), &FakeTransport::default())
            .await
            .unwrap();
        assert_eq!(manifest.rows.len(), 4);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let path = temp_dir("manifest-missing").join("nope.csv");
        let err = load(&ManifestSource::File(path.clone()), &FakeTransport::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::NotFound(p) if p == path));
    }

    #[tokio::test]
    async fn downloads_sheets_export() {
        let transport = FakeTransport::default().with(
            "https://docs.google.com/spreadsheets/d/sheet1/export?format=csv&gid=7",
            FakeReply::body("text/csv", SHEET.as_bytes()),
        );
        let source = ManifestSource::parse("https://docs.google.com/spreadsheets/d/sheet1/edit?gid=7");

        let manifest = load(&source, &transport).await.unwrap();
        assert_eq!(manifest.groups, vec!["Era A", "Era C"]);
        assert_eq!(
            transport.requests(),
            vec!["https://docs.google.com/spreadsheets/d/sheet1/export?format=csv&gid=7"]
        );
    }

    #[tokio::test]
    async fn tiny_sheets_export_is_rejected() {
        let transport = FakeTransport::default().with(
            "https://docs.google.com/spreadsheets/d/s/export?format=csv&gid=0",
            FakeReply::body("text/csv", b"Era,Name,Link\n"),
        );
        let source = ManifestSource::parse("https://docs.google.com/spreadsheets/d/s/edit");
        assert!(matches!(
            load(&source, &transport).await,
            Err(LoadError::Download { .. })
        ));
    }

    #[tokio::test]
    async fn http_error_is_a_download_failure() {
        let source = ManifestSource::parse("https://example.com/sheet.csv");
        let err = load(&source, &FakeTransport::default()).await.unwrap_err();
        match err {
            LoadError::Download { url, reason } => {
                assert_eq!(url, "https://example.com/sheet.csv");
                assert_eq!(reason, "HTTP 404");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
