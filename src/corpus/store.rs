//! HoldingsTable persistence
//!
//! One CSV file per batch, one row per holding record. The writer and the
//! reader live together so the format stays a single round trip:
//!
//! `filed name,cusip,value,amount,put_or_call,owner,cik,report_date`

use super::{CorpusError, CorpusResult, HoldingsTable};
use crate::filing::{HoldingRecord, OptionFlag};
use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use tracing::info;

const HEADER: &str = "filed name,cusip,value,amount,put_or_call,owner,cik,report_date";
const COLUMNS: usize = 8;

/// Quote a field when it contains a delimiter, a quote, or a newline.
fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Parse the whole file into rows of fields, honoring quoted fields with
/// doubled quotes. A newline inside a quoted field belongs to the field,
/// not to the row structure: issuer and owner names pass through the tag
/// scanner with interior whitespace intact, so a row may span physical
/// lines. Each row is returned with the line number it started on.
fn read_rows(text: &str) -> CorpusResult<Vec<(usize, Vec<String>)>> {
    let mut rows = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut row_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.is_empty() => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            '\n' if in_quotes => {
                current.push('\n');
                line += 1;
            }
            '\n' => {
                line += 1;
                if fields.is_empty() && current.is_empty() {
                    // Blank line between rows.
                    row_line = line;
                    continue;
                }
                fields.push(std::mem::take(&mut current));
                rows.push((row_line, std::mem::take(&mut fields)));
                row_line = line;
            }
            _ => current.push(c),
        }
    }
    if in_quotes {
        return Err(CorpusError::Csv {
            line: row_line,
            msg: "unterminated quoted field".to_string(),
        });
    }
    if !fields.is_empty() || !current.is_empty() {
        fields.push(current);
        rows.push((row_line, fields));
    }
    Ok(rows)
}

/// Persist a holdings table to `path`.
pub fn save_table(path: &Path, table: &HoldingsTable) -> CorpusResult<()> {
    let mut out = String::with_capacity(table.len() * 64);
    out.push_str(HEADER);
    out.push('\n');
    for rec in table.records() {
        out.push_str(&escape(&rec.issuer_name));
        out.push(',');
        out.push_str(&rec.cusip);
        out.push(',');
        out.push_str(&rec.value.to_string());
        out.push(',');
        out.push_str(&rec.share_amount.to_string());
        out.push(',');
        out.push_str(rec.option_flag.as_str());
        out.push(',');
        out.push_str(&escape(&rec.owner_name));
        out.push(',');
        out.push_str(&rec.owner_id);
        out.push(',');
        out.push_str(&rec.report_date.format("%Y-%m-%d").to_string());
        out.push('\n');
    }
    fs::write(path, out)?;
    info!(path = %path.display(), rows = table.len(), "holdings table saved");
    Ok(())
}

/// Load a holdings table persisted by [`save_table`].
pub fn load_table(path: &Path) -> CorpusResult<HoldingsTable> {
    let text = fs::read_to_string(path)?;
    let mut records = Vec::new();

    for (idx, (line_no, fields)) in read_rows(&text)?.into_iter().enumerate() {
        if idx == 0 {
            // Header row.
            continue;
        }
        let bad = |msg: String| CorpusError::Csv { line: line_no, msg };
        if fields.len() != COLUMNS {
            return Err(bad(format!(
                "expected {} columns, got {}",
                COLUMNS,
                fields.len()
            )));
        }

        let value = fields[2]
            .parse::<u64>()
            .map_err(|e| bad(format!("value: {e}")))?;
        let share_amount = fields[3]
            .parse::<u64>()
            .map_err(|e| bad(format!("amount: {e}")))?;
        let option_flag = OptionFlag::from_column(&fields[4])
            .ok_or_else(|| bad(format!("put_or_call: unrecognized {:?}", fields[4])))?;
        let report_date = NaiveDate::parse_from_str(&fields[7], "%Y-%m-%d")
            .map_err(|e| bad(format!("report_date: {e}")))?;

        records.push(HoldingRecord {
            issuer_name: fields[0].clone(),
            cusip: fields[1].clone(),
            value,
            share_amount,
            option_flag,
            owner_name: fields[5].clone(),
            owner_id: fields[6].clone(),
            report_date,
        });
    }

    Ok(HoldingsTable::new(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(name: &str, owner: &str) -> HoldingRecord {
        HoldingRecord {
            issuer_name: name.to_string(),
            cusip: "037833100".to_string(),
            value: 120,
            share_amount: 40,
            option_flag: OptionFlag::None,
            owner_name: owner.to_string(),
            owner_id: "0000001".to_string(),
            report_date: NaiveDate::from_ymd_opt(2019, 12, 31).unwrap(),
        }
    }

    #[test]
    fn round_trips_including_quoted_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("filingsEnd2019.csv");
        let table = HoldingsTable::new(vec![
            record("APPLE INC", "ACME CAPITAL"),
            record("SMUCKER J M CO (CL \"B\")", "FUNDS, GREAT & SMALL"),
        ]);

        save_table(&path, &table).unwrap();
        let loaded = load_table(&path).unwrap();
        assert_eq!(loaded.records(), table.records());
    }

    #[test]
    fn malformed_row_reports_line_number() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, format!("{HEADER}\nAPPLE,037833100,notanumber,1,No,A,1,2019-12-31\n"))
            .unwrap();
        match load_table(&path) {
            Err(CorpusError::Csv { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected Csv error, got {other:?}"),
        }
    }

    #[test]
    fn read_rows_handles_doubled_quotes() {
        let rows = read_rows("\"a,b\",plain,\"say \"\"hi\"\"\"\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1, vec!["a,b", "plain", "say \"hi\""]);
    }

    #[test]
    fn read_rows_spans_quoted_newlines() {
        let rows = read_rows("\"TWO\nLINES\",x\nsecond,y\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1, vec!["TWO\nLINES", "x"]);
        // The second row starts after the two physical lines of the first.
        assert_eq!(rows[1].0, 3);
        assert_eq!(rows[1].1, vec!["second", "y"]);
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert!(matches!(
            read_rows("\"never closed,x\n"),
            Err(CorpusError::Csv { .. })
        ));
    }

    #[test]
    fn round_trips_a_name_with_an_embedded_newline() {
        // The tag scanner only trims field edges, so an issuer name can
        // legitimately carry an interior newline; the saved row must stay
        // loadable.
        let dir = tempdir().unwrap();
        let path = dir.path().join("filingsEnd2020.csv");
        let table = HoldingsTable::new(vec![
            record("APPLE\nINC", "ACME CAPITAL"),
            record("PLAIN CO", "FUND\nADVISORS LP"),
        ]);

        save_table(&path, &table).unwrap();
        let loaded = load_table(&path).unwrap();
        assert_eq!(loaded.records(), table.records());
    }
}
