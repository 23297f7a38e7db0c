use serde::Deserialize;
use std::path::Path;

use crate::core::record::Record;
use crate::parsing::ParseError;
use crate::utils::validation::{check_record_limit, MAX_FIELD_LENGTH};

/// Record as it appears in a JSON import file
#[derive(Debug, Deserialize)]
struct ImportedRecord {
    #[serde(alias = "id", alias = "ratingKey")]
    external_id: String,
    title: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default, alias = "series")]
    embedded_series_hint: Option<String>,
    #[serde(default, alias = "series_index")]
    embedded_position: Option<String>,
}

/// Parse an import file, choosing JSON or delimited text from its content
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or other parse errors
/// if the content is invalid.
pub fn parse_records_file(path: &Path) -> Result<Vec<Record>, ParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_records_text(&content)
}

/// Parse import text: a JSON array if it starts with `[`, otherwise TSV/CSV
///
/// # Errors
///
/// See [`parse_records_json`] and [`parse_records_delimited`].
pub fn parse_records_text(text: &str) -> Result<Vec<Record>, ParseError> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return parse_records_json(trimmed);
    }

    let delimiter = trimmed
        .lines()
        .find(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .map_or('\t', |line| if line.contains('\t') { '\t' } else { ',' });
    parse_records_delimited(text, delimiter)
}

/// Parse a JSON array of records
///
/// # Errors
///
/// Returns `ParseError::Json` for malformed JSON, `ParseError::TooManyRecords`
/// if the limit is exceeded, or `ParseError::InvalidFormat` for blank ids,
/// blank titles or oversized fields.
pub fn parse_records_json(text: &str) -> Result<Vec<Record>, ParseError> {
    let imported: Vec<ImportedRecord> = serde_json::from_str(text)?;
    if check_record_limit(imported.len().saturating_sub(1)).is_some() {
        return Err(ParseError::TooManyRecords(imported.len()));
    }

    imported
        .into_iter()
        .enumerate()
        .map(|(i, r)| {
            build_record(
                &format!("entry {}", i + 1),
                &r.external_id,
                &r.title,
                r.author.as_deref(),
                r.embedded_series_hint.as_deref(),
                r.embedded_position.as_deref(),
            )
        })
        .collect()
}

/// Parse delimited text with columns: `external_id, title, [author], [series], [position]`
///
/// A header line is detected and skipped. Fields may be double-quoted so that
/// titles can contain the delimiter.
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if lines have fewer than 2 fields or no
/// records are found, or `ParseError::TooManyRecords` if the limit is exceeded.
pub fn parse_records_delimited(text: &str, delimiter: char) -> Result<Vec<Record>, ParseError> {
    let mut records = Vec::new();
    let mut first_data_line = true;

    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let fields = split_fields(line, delimiter);

        if first_data_line {
            first_data_line = false;
            let first = fields.first().map(|s| s.to_lowercase()).unwrap_or_default();
            if matches!(first.as_str(), "external_id" | "id" | "rating_key" | "ratingkey") {
                continue;
            }
        }

        let line_num = i + 1;

        if fields.len() < 2 {
            return Err(ParseError::InvalidFormat(format!(
                "Line {line_num} has fewer than 2 fields"
            )));
        }

        if check_record_limit(records.len()).is_some() {
            return Err(ParseError::TooManyRecords(records.len()));
        }

        let optional = |idx: usize| fields.get(idx).map(String::as_str);
        records.push(build_record(
            &format!("line {line_num}"),
            &fields[0],
            &fields[1],
            optional(2),
            optional(3),
            optional(4),
        )?);
    }

    if records.is_empty() {
        return Err(ParseError::InvalidFormat(
            "No records found in file".to_string(),
        ));
    }

    Ok(records)
}

fn build_record(
    location: &str,
    external_id: &str,
    title: &str,
    author: Option<&str>,
    series: Option<&str>,
    position: Option<&str>,
) -> Result<Record, ParseError> {
    let external_id = external_id.trim();
    let title = title.trim();
    if external_id.is_empty() {
        return Err(ParseError::InvalidFormat(format!("Missing external id on {location}")));
    }
    if title.is_empty() {
        return Err(ParseError::InvalidFormat(format!("Missing title on {location}")));
    }

    for value in [Some(external_id), Some(title), author, series, position]
        .into_iter()
        .flatten()
    {
        if value.len() > MAX_FIELD_LENGTH {
            return Err(ParseError::InvalidFormat(format!(
                "Field on {location} exceeds {MAX_FIELD_LENGTH} characters"
            )));
        }
    }

    let mut record = Record::new(external_id, title);
    if let Some(author) = author.map(str::trim).filter(|s| !s.is_empty()) {
        record = record.with_author(author);
    }
    if let Some(series) = series.map(str::trim).filter(|s| !s.is_empty()) {
        record = record.with_series_hint(series);
    }
    if let Some(position) = position.map(str::trim).filter(|s| !s.is_empty()) {
        record = record.with_embedded_position(position);
    }
    Ok(record)
}

/// Split one line on `delimiter`, honoring double quotes and `""` escapes
fn split_fields(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tsv_with_header() {
        let tsv = "external_id\ttitle\tauthor\tseries\tposition
101\tStormbreaker\tAnthony Horowitz\tAlex Rider\t1
102\tThe Stand\tStephen King\t\t
";
        let records = parse_records_text(tsv).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].external_id.as_str(), "101");
        assert_eq!(records[0].series_hint(), Some("Alex Rider"));
        assert_eq!(records[0].embedded_position.as_deref(), Some("1"));
        assert_eq!(records[1].author(), Some("Stephen King"));
        assert_eq!(records[1].series_hint(), None);
    }

    #[test]
    fn test_parse_csv_quoted_title() {
        let csv = "id,title,author
7,\"Guards! Guards! (Discworld, Book 8)\",Terry Pratchett
8,\"The \"\"Lost\"\" Book\",
";
        let records = parse_records_text(csv).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Guards! Guards! (Discworld, Book 8)");
        assert_eq!(records[1].title, "The \"Lost\" Book");
        assert_eq!(records[1].author(), None);
    }

    #[test]
    fn test_parse_tsv_no_header() {
        let records = parse_records_text("1\tDune\n2\tDune Messiah\n").unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_parse_json() {
        let json = r#"[
            {"external_id": "1", "title": "Foundation", "series": "Foundation"},
            {"id": "2", "title": "The Stand", "author": "Stephen King"}
        ]"#;
        let records = parse_records_text(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].series_hint(), Some("Foundation"));
        assert_eq!(records[1].external_id.as_str(), "2");
    }

    #[test]
    fn test_missing_title_is_error() {
        let err = parse_records_text("1\t  \n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidFormat(_)));

        let err = parse_records_json(r#"[{"id": "", "title": "Dune"}]"#).unwrap_err();
        assert!(err.to_string().contains("entry 1"));
    }

    #[test]
    fn test_too_few_fields() {
        let err = parse_records_delimited("1\n", '\t').unwrap_err();
        assert!(err.to_string().contains("Line 1"));
    }

    #[test]
    fn test_empty_file() {
        assert!(parse_records_text("# only a comment\n").is_err());
    }
}
