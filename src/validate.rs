//! Schema validation and normalization for raw race-result rows.
//!
//! Parses the tabular source into typed [`RawRecord`]s: empty or absent
//! fields become the sentinel, a known placeholder state code is rewritten,
//! the finish-time string is decoded into seconds (degrading to the sentinel
//! on malformed input), and rows that fail typing are rejected with a typed
//! reason rather than aborting the run. Accepted rows preserve source order.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::models::{RawRecord, SENTINEL};
use crate::timefmt;

/// Header written to the validated CSV, in fixed order. `finish_seconds` is
/// the derived column; the rest mirror the source.
const OUTPUT_COLUMNS: [&str; 11] = [
    "Year",
    "Race",
    "Name",
    "Gender",
    "Age",
    "State",
    "Country",
    "Overall",
    "Finish_Time",
    "finish_seconds",
    "Finish",
];

/// State placeholder code some source exports use for "no state".
const STATE_PLACEHOLDER: &str = "-0";

/// Why a single row was excluded from the output stream.
///
/// A rejection is local to its row: it is logged and counted, never
/// propagated as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// A mandatory field (Year or Name) is absent or empty.
    MissingField(&'static str),
    /// A present field failed integer coercion.
    BadInteger { field: &'static str, value: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MissingField(field) => {
                write!(f, "mandatory field {} is missing", field)
            }
            RejectReason::BadInteger { field, value } => {
                write!(f, "field {} is not an integer: '{}'", field, value)
            }
        }
    }
}

/// Outcome of validating one source file.
pub struct ValidationReport {
    pub total_rows: u64,
    pub rejected: u64,
    /// Accepted records, in source row order.
    pub records: Vec<RawRecord>,
}

/// Normalize one raw cell: empty or missing becomes the sentinel.
fn normalize(cell: Option<&str>) -> String {
    match cell {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => SENTINEL.to_string(),
    }
}

fn non_sentinel(value: &str) -> Option<&str> {
    if value == SENTINEL {
        None
    } else {
        Some(value)
    }
}

fn parse_optional_int(value: &str, field: &'static str) -> Result<Option<i64>, RejectReason> {
    match non_sentinel(value) {
        None => Ok(None),
        Some(s) => s.parse::<i64>().map(Some).map_err(|_| {
            RejectReason::BadInteger {
                field,
                value: s.to_string(),
            }
        }),
    }
}

/// Validate a single row given as a column-name to raw-value mapping.
///
/// Normalization runs before typing, so a malformed finish time downgrades
/// the derived seconds to absent while the row itself survives.
pub fn validate_row(row: &HashMap<String, String>) -> Result<RawRecord, RejectReason> {
    let get = |col: &str| normalize(row.get(col).map(String::as_str));

    let name = get("Name");
    if name == SENTINEL {
        return Err(RejectReason::MissingField("Name"));
    }

    let year_raw = get("Year");
    let year = match non_sentinel(&year_raw) {
        None => return Err(RejectReason::MissingField("Year")),
        Some(s) => s
            .parse::<i64>()
            .map_err(|_| RejectReason::BadInteger {
                field: "Year",
                value: s.to_string(),
            })?,
    };

    let finish_time = non_sentinel(&get("Finish_Time")).map(str::to_string);
    let finish_seconds = finish_time
        .as_deref()
        .and_then(timefmt::seconds_of_hms);

    let state_raw = get("State");
    let state = if state_raw == STATE_PLACEHOLDER {
        None
    } else {
        non_sentinel(&state_raw).map(str::to_string)
    };

    Ok(RawRecord {
        year,
        race: get("Race"),
        name,
        gender: non_sentinel(&get("Gender")).map(str::to_string),
        age: parse_optional_int(&get("Age"), "Age")?,
        state,
        country: non_sentinel(&get("Country")).map(str::to_string),
        overall: parse_optional_int(&get("Overall"), "Overall")?,
        finish_time,
        finish_seconds,
        finish_place: parse_optional_int(&get("Finish"), "Finish")?,
    })
}

/// Read the source header and map every column name to its position,
/// folding the alternate "Finish Time" spelling onto "Finish_Time".
fn header_positions(headers: &csv::StringRecord) -> Result<HashMap<String, usize>> {
    let mut positions = HashMap::new();
    for (i, name) in headers.iter().enumerate() {
        let name = if name.trim() == "Finish Time" {
            "Finish_Time".to_string()
        } else {
            name.trim().to_string()
        };
        positions.insert(name, i);
    }
    for required in ["Year", "Race", "Name"] {
        if !positions.contains_key(required) {
            bail!("source is missing required column: {}", required);
        }
    }
    Ok(positions)
}

fn row_to_map(
    record: &csv::StringRecord,
    positions: &HashMap<String, usize>,
) -> HashMap<String, String> {
    positions
        .iter()
        .filter_map(|(name, &i)| {
            record
                .get(i)
                .map(|cell| (name.clone(), cell.to_string()))
        })
        .collect()
}

/// Parse rows from an already-open CSV reader, logging rejections.
fn validate_reader<R: std::io::Read>(reader: &mut csv::Reader<R>) -> Result<ValidationReport> {
    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    let positions = header_positions(&headers)?;

    let mut report = ValidationReport {
        total_rows: 0,
        rejected: 0,
        records: Vec::new(),
    };

    for row in reader.records() {
        let row = row.context("Failed to read CSV row")?;
        report.total_rows += 1;
        let map = row_to_map(&row, &positions);
        match validate_row(&map) {
            Ok(record) => report.records.push(record),
            Err(reason) => {
                let who = map
                    .get("Name")
                    .filter(|n| !n.trim().is_empty())
                    .cloned()
                    .unwrap_or_else(|| SENTINEL.to_string());
                eprintln!("Warning: validation failed for row: {} | {}", who, reason);
                report.rejected += 1;
            }
        }
    }

    Ok(report)
}

fn sentinel_or<T: ToString>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => SENTINEL.to_string(),
    }
}

/// Write accepted records as the validated CSV with the fixed column set.
/// Every absent value is written as the sentinel, never left blank.
pub fn write_validated_csv(path: &Path, records: &[RawRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    writer.write_record(OUTPUT_COLUMNS)?;
    for r in records {
        writer.write_record([
            r.year.to_string(),
            r.race.clone(),
            r.name.clone(),
            r.gender.clone().unwrap_or_else(|| SENTINEL.to_string()),
            sentinel_or(&r.age),
            r.state.clone().unwrap_or_else(|| SENTINEL.to_string()),
            r.country.clone().unwrap_or_else(|| SENTINEL.to_string()),
            sentinel_or(&r.overall),
            r.finish_time.clone().unwrap_or_else(|| SENTINEL.to_string()),
            sentinel_or(&r.finish_seconds),
            sentinel_or(&r.finish_place),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Validate a full CSV file and write the cleaned copy.
///
/// Rejected rows are logged and dropped; an unreadable file or a missing
/// mandatory column is a structural failure and aborts.
pub fn validate_csv(input: &Path, output: &Path) -> Result<ValidationReport> {
    let mut reader = csv::Reader::from_path(input)
        .with_context(|| format!("Failed to read source file: {}", input.display()))?;
    let report = validate_reader(&mut reader)?;
    write_validated_csv(output, &report.records)?;
    Ok(report)
}

/// Read records back from a previously validated CSV.
///
/// Rows are re-checked with the same validator; a validated file normally
/// round-trips losslessly, and any row that no longer passes is logged and
/// skipped rather than failing the run.
pub fn read_validated_csv(path: &Path) -> Result<Vec<RawRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to read validated file: {}", path.display()))?;
    let report = validate_reader(&mut reader)?;
    Ok(report.records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_row() -> HashMap<String, String> {
        row(&[
            ("Year", "2021"),
            ("Race", "NYC Marathon"),
            ("Name", "Jane Doe"),
            ("Gender", "F"),
            ("Age", "34"),
            ("State", "NY"),
            ("Country", "USA"),
            ("Overall", "12"),
            ("Finish_Time", "2:45:30"),
            ("Finish", "12"),
        ])
    }

    #[test]
    fn test_accepts_full_row_and_derives_seconds() {
        let rec = validate_row(&full_row()).unwrap();
        assert_eq!(rec.year, 2021);
        assert_eq!(rec.name, "Jane Doe");
        assert_eq!(rec.finish_seconds, Some(2 * 3600 + 45 * 60 + 30));
        assert_eq!(rec.overall, Some(12));
    }

    #[test]
    fn test_rejects_missing_name_and_year() {
        let mut r = full_row();
        r.insert("Name".to_string(), "".to_string());
        assert_eq!(
            validate_row(&r),
            Err(RejectReason::MissingField("Name"))
        );

        let mut r = full_row();
        r.remove("Year");
        assert_eq!(
            validate_row(&r),
            Err(RejectReason::MissingField("Year"))
        );
    }

    #[test]
    fn test_rejects_bad_integer_field() {
        let mut r = full_row();
        r.insert("Age".to_string(), "INVALID".to_string());
        assert!(matches!(
            validate_row(&r),
            Err(RejectReason::BadInteger { field: "Age", .. })
        ));
    }

    #[test]
    fn test_malformed_time_degrades_not_rejects() {
        let mut r = full_row();
        r.insert("Finish_Time".to_string(), "1:2".to_string());
        let rec = validate_row(&r).unwrap();
        assert_eq!(rec.finish_time.as_deref(), Some("1:2"));
        assert_eq!(rec.finish_seconds, None);
    }

    #[test]
    fn test_empty_optional_fields_become_absent() {
        let r = row(&[("Year", "2020"), ("Race", ""), ("Name", "A")]);
        let rec = validate_row(&r).unwrap();
        assert_eq!(rec.race, SENTINEL);
        assert_eq!(rec.gender, None);
        assert_eq!(rec.age, None);
        assert_eq!(rec.finish_time, None);
    }

    #[test]
    fn test_state_placeholder_rewritten() {
        let mut r = full_row();
        r.insert("State".to_string(), "-0".to_string());
        let rec = validate_row(&r).unwrap();
        assert_eq!(rec.state, None);
    }

    fn validate_str(csv_text: &str) -> ValidationReport {
        let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
        validate_reader(&mut reader).unwrap()
    }

    #[test]
    fn test_finish_time_header_alias() {
        let report = validate_str(
            "Year,Race,Name,Finish Time\n2020,NYC,A,3:00:00\n",
        );
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].finish_seconds, Some(10800));
    }

    #[test]
    fn test_rejected_rows_dropped_order_preserved() {
        let report = validate_str(
            "Year,Race,Name,Age\n\
             2020,NYC,A,30\n\
             2020,NYC,B,INVALID\n\
             2021,NYC,C,41\n",
        );
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.rejected, 1);
        let names: Vec<&str> = report.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn test_missing_required_column_is_structural() {
        let mut reader = csv::Reader::from_reader("Year,Name\n2020,A\n".as_bytes());
        assert!(validate_reader(&mut reader).is_err());
    }

    #[test]
    fn test_validated_csv_round_trip() {
        let report = validate_str(
            "Year,Race,Name,Gender,Age,State,Country,Overall,Finish Time,Finish\n\
             2021,NYC,Jane,F,34,NY,USA,12,2:45:30,12\n\
             2021,NYC,Jo,,,,,,,\n",
        );
        let tmp = tempfile::NamedTempFile::new().unwrap();
        write_validated_csv(tmp.path(), &report.records).unwrap();

        let text = std::fs::read_to_string(tmp.path()).unwrap();
        assert!(text.starts_with(
            "Year,Race,Name,Gender,Age,State,Country,Overall,Finish_Time,finish_seconds,Finish"
        ));
        assert!(!text.contains(",,"), "no blank cells in validated output");

        let back = read_validated_csv(tmp.path()).unwrap();
        assert_eq!(back, report.records);
    }
}
