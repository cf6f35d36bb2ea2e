//! Legacy report file reader
//!
//! Expected header (UTF-8 CSV): `Player, Team, DATE, SCOUT, Starting
//! Position, Match Rating, Resume`. Header names are matched after trimming
//! and ignoring case. `Verdict` (or `Advies`) and `Profile` are picked up
//! when present; every other column is ignored.

use serde::Serialize;
use std::io::Read;

use scoutdesk_common::{Error, Result};

pub const REQUIRED_COLUMNS: [&str; 7] = [
    "Player",
    "Team",
    "DATE",
    "SCOUT",
    "Starting Position",
    "Match Rating",
    "Resume",
];

/// One data row of a legacy file, values trimmed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyRow {
    /// 1-based data row number (header excluded)
    pub line: usize,
    pub player: String,
    pub team: String,
    pub date: String,
    pub scout_email: String,
    pub position: String,
    pub rating: String,
    pub resume: String,
    pub verdict: Option<String>,
    pub profile: Option<String>,
}

struct ColumnMap {
    required: [usize; 7],
    verdict: Option<usize>,
    profile: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
        };

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|name| find(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(Error::Validation(format!(
                "legacy file is missing required columns: {}",
                missing.join(", ")
            )));
        }

        let mut required = [0usize; 7];
        for (slot, name) in required.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = find(name).unwrap_or_default();
        }

        Ok(Self {
            required,
            verdict: find("Verdict").or_else(|| find("Advies")),
            profile: find("Profile"),
        })
    }
}

fn cell(record: &csv::StringRecord, index: usize) -> String {
    record.get(index).unwrap_or("").trim().to_string()
}

fn optional_cell(record: &csv::StringRecord, index: Option<usize>) -> Option<String> {
    index.map(|i| cell(record, i)).filter(|v| !v.is_empty())
}

/// Parse a whole legacy file
pub fn read_legacy_rows<R: Read>(reader: R) -> Result<Vec<LegacyRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| Error::Validation(format!("unreadable legacy header: {}", e)))?
        .clone();
    let columns = ColumnMap::from_headers(&headers)?;

    let mut rows = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record =
            record.map_err(|e| Error::Validation(format!("legacy row {}: {}", index + 1, e)))?;
        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        let [player, team, date, scout, position, rating, resume] = columns.required;
        rows.push(LegacyRow {
            line: index + 1,
            player: cell(&record, player),
            team: cell(&record, team),
            date: cell(&record, date),
            scout_email: cell(&record, scout),
            position: cell(&record, position),
            rating: cell(&record, rating),
            resume: cell(&record, resume),
            verdict: optional_cell(&record, columns.verdict),
            profile: optional_cell(&record, columns.profile),
        });
    }
    Ok(rows)
}

pub fn read_legacy_str(text: &str) -> Result<Vec<LegacyRow>> {
    read_legacy_rows(text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_required_and_optional_columns() {
        let text = "\
Player, Team ,DATE,SCOUT,Starting Position,Match Rating,Resume,Verdict,Notes
J. Doe,Ajax,01-03-2021,a@b,CM,\"3,5\",\"goede wedstrijd, veel loopvermogen\",B,ignored
";
        let rows = read_legacy_str(text).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.player, "J. Doe");
        assert_eq!(row.team, "Ajax");
        assert_eq!(row.rating, "3,5");
        assert_eq!(row.resume, "goede wedstrijd, veel loopvermogen");
        assert_eq!(row.verdict.as_deref(), Some("B"));
        assert_eq!(row.profile, None);
    }

    #[test]
    fn test_missing_column_aborts() {
        let text = "Player,Team,DATE,SCOUT,Match Rating,Resume\nx,y,z,a@b,4,r\n";
        match read_legacy_str(text) {
            Err(Error::Validation(msg)) => assert!(msg.contains("Starting Position")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_rows_skipped_and_lines_numbered() {
        let text = "Player,Team,DATE,SCOUT,Starting Position,Match Rating,Resume\n\
                    A,T,,s@c,FW,4,one\n\
                    ,,,,,,\n\
                    B,T,,s@c,FW,4,two\n";
        let rows = read_legacy_str(text).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].line, 3);
    }
}
