//! Schema-driven extraction of one 13F-HR document
//!
//! The required field set is declared up front and validated before any
//! record is built, so a document missing a mandatory tag fails whole with
//! a [`ParseError`] instead of leaking nulls into downstream arithmetic.

use super::scanner::TagDocument;
use super::{
    FilingMetadata, HoldingRecord, OptionFlag, ParseError, ParseResult, ParsedFiling,
    COMMON_STOCK_CLASS,
};
use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use tracing::warn;

// Mandatory document-level tags (normalized names).
const TAG_FILING_MANAGER: &str = "filingmanager";
const TAG_FILER_NAME: &str = "name";
const TAG_CIK: &str = "cik";
const TAG_FORM_TYPE: &str = "type";
const TAG_FILE_NUMBER: &str = "form13ffilenumber";
const TAG_PERIOD_OF_REPORT: &str = "periodofreport";
const TAG_SIGNATURE_DATE: &str = "signaturedate";

// Holding-entry tags.
const TAG_INFO_TABLE: &str = "infotable";
const TAG_ISSUER_NAME: &str = "nameofissuer";
const TAG_TITLE_OF_CLASS: &str = "titleofclass";
const TAG_CUSIP: &str = "cusip";
const TAG_VALUE: &str = "value";
const TAG_SHARES_BLOCK: &str = "shrsorprnamt";
const TAG_SHARE_AMOUNT: &str = "sshprnamt";
const TAG_PUT_CALL: &str = "putcall";

fn required<'a>(doc: &TagDocument<'a>, tag: &'static str) -> ParseResult<&'a str> {
    doc.text_of(tag).ok_or(ParseError::MissingTag(tag))
}

/// Strict `MM-DD-YYYY`. The shape is checked before handing the value to
/// chrono, which would otherwise accept unpadded variants.
fn parse_date(tag: &'static str, value: &str) -> ParseResult<NaiveDate> {
    let bad = || ParseError::BadDate {
        tag,
        value: value.to_string(),
    };
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[2] != b'-' || bytes[5] != b'-' {
        return Err(bad());
    }
    NaiveDate::parse_from_str(value, "%m-%d-%Y").map_err(|_| bad())
}

fn parse_u64(tag: &'static str, value: &str) -> ParseResult<u64> {
    value.trim().parse::<u64>().map_err(|_| ParseError::BadNumber {
        tag,
        value: value.to_string(),
    })
}

/// Parse one filing from disk.
pub fn parse_file(path: &Path) -> ParseResult<ParsedFiling> {
    let text = fs::read_to_string(path)?;
    parse_document(&text)
}

/// Parse one filing from its raw text. Pure: one document in, filer
/// metadata plus holding records out.
pub fn parse_document(text: &str) -> ParseResult<ParsedFiling> {
    let doc = TagDocument::parse(text);

    let filer_name = doc
        .block(TAG_FILING_MANAGER)
        .and_then(|m| m.text_of(TAG_FILER_NAME).map(str::to_string))
        .ok_or(ParseError::MissingTag(TAG_FILING_MANAGER))?;
    let filer_id = required(&doc, TAG_CIK)?.to_string();
    let form_type = required(&doc, TAG_FORM_TYPE)?.to_string();
    let file_number = required(&doc, TAG_FILE_NUMBER)?.to_string();
    let period_of_report = parse_date(TAG_PERIOD_OF_REPORT, required(&doc, TAG_PERIOD_OF_REPORT)?)?;
    let filing_date = parse_date(TAG_SIGNATURE_DATE, required(&doc, TAG_SIGNATURE_DATE)?)?;

    if filing_date < period_of_report {
        // Disclosure lag should be non-negative; a violation is suspect
        // but not grounds to reject the document.
        warn!(
            filer = %filer_id,
            %filing_date,
            %period_of_report,
            "signature date precedes period of report"
        );
    }

    let metadata = FilingMetadata {
        filer_name,
        filer_id,
        form_type,
        file_number,
        period_of_report,
        filing_date,
    };

    let mut holdings = Vec::new();
    for entry in doc.blocks(TAG_INFO_TABLE) {
        holdings.push(parse_holding(&entry, &metadata)?);
    }

    Ok(ParsedFiling { metadata, holdings })
}

fn parse_holding(entry: &TagDocument<'_>, metadata: &FilingMetadata) -> ParseResult<HoldingRecord> {
    // Dots are dropped from issuer names ("APPLE INC." == "APPLE INC").
    let raw_name = required(entry, TAG_ISSUER_NAME)?.replace('.', "");
    let class = required(entry, TAG_TITLE_OF_CLASS)?;
    // Common stock keeps the bare issuer name; any other class becomes a
    // distinct display label without losing the issuer linkage (the CUSIP
    // family still groups them).
    let issuer_name = if class == COMMON_STOCK_CLASS {
        raw_name
    } else {
        format!("{} ({})", raw_name, class)
    };

    let cusip = required(entry, TAG_CUSIP)?.to_string();
    let value = parse_u64(TAG_VALUE, required(entry, TAG_VALUE)?)?;
    let share_amount = entry
        .block(TAG_SHARES_BLOCK)
        .and_then(|b| b.text_of(TAG_SHARE_AMOUNT).map(str::to_string))
        .ok_or(ParseError::MissingTag(TAG_SHARES_BLOCK))
        .and_then(|v| parse_u64(TAG_SHARE_AMOUNT, &v))?;

    let option_flag = match entry.text_of(TAG_PUT_CALL) {
        None | Some("") => OptionFlag::None,
        Some(marker) => match marker.to_ascii_lowercase().as_str() {
            "put" => OptionFlag::Put,
            "call" => OptionFlag::Call,
            // Filers occasionally write free-form markers here. The row
            // stays in the filing; aggregation skips it like any option.
            other => {
                warn!(marker = other, "unrecognized putCall marker");
                OptionFlag::Other
            }
        },
    };

    Ok(HoldingRecord {
        issuer_name,
        cusip,
        value,
        share_amount,
        option_flag,
        owner_name: metadata.filer_name.clone(),
        owner_id: metadata.filer_id.clone(),
        report_date: metadata.period_of_report,
    })
}
