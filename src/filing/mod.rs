//! 13F-HR filing model: holding records, filer metadata, parse errors.

mod parser;
mod scanner;

pub use parser::{parse_document, parse_file};
pub use scanner::TagDocument;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Form type this pipeline accepts as a source document.
pub const TARGET_FORM_TYPE: &str = "13F-HR";

/// Canonical title-of-class marker for plain common stock. Any other class
/// (preferred, warrants, class A, ...) is kept as a suffix on the issuer
/// name so it displays as a distinct instrument.
pub const COMMON_STOCK_CLASS: &str = "COM";

/// Errors raised while parsing one filing document.
///
/// `MissingTag` is a structural failure (a mandatory field is absent);
/// `BadDate` / `BadNumber` are format failures. Either way the whole
/// document is rejected and no partial record is emitted.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("required tag <{0}> not found")]
    MissingTag(&'static str),

    #[error("field <{tag}>: expected MM-DD-YYYY date, got {value:?}")]
    BadDate { tag: &'static str, value: String },

    #[error("field <{tag}>: expected unsigned integer, got {value:?}")]
    BadNumber { tag: &'static str, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Put/call marker on a holding entry. Absent means a straight equity
/// position. `Other` covers markers the schema does not name; the row is
/// kept but excluded from share aggregation like any option position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OptionFlag {
    #[default]
    None,
    Put,
    Call,
    Other,
}

impl OptionFlag {
    /// Tabular representation, matching the persisted `put_or_call` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionFlag::None => "No",
            OptionFlag::Put => "Put",
            OptionFlag::Call => "Call",
            OptionFlag::Other => "Other",
        }
    }

    /// Inverse of [`as_str`](Self::as_str); `None` for anything else.
    pub fn from_column(value: &str) -> Option<Self> {
        match value {
            "No" => Some(OptionFlag::None),
            "Put" => Some(OptionFlag::Put),
            "Call" => Some(OptionFlag::Call),
            "Other" => Some(OptionFlag::Other),
            _ => None,
        }
    }
}

impl fmt::Display for OptionFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line item in one filing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingRecord {
    /// Issuer display name; non-common share classes carry a
    /// parenthesized class suffix.
    pub issuer_name: String,
    /// 9-character security identifier. The first 6 characters identify
    /// the issuing company across share classes.
    pub cusip: String,
    /// Reported value in thousands of dollars.
    pub value: u64,
    /// Number of shares (or principal amount).
    pub share_amount: u64,
    /// Put/call marker; anything but `None` is excluded from aggregation.
    pub option_flag: OptionFlag,
    /// Filing institution's name.
    pub owner_name: String,
    /// Filing institution's CIK.
    pub owner_id: String,
    /// Period-of-report date of the source filing.
    pub report_date: NaiveDate,
}

/// Per-document filer metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingMetadata {
    pub filer_name: String,
    /// Central Index Key; stable across quarters for the same institution.
    pub filer_id: String,
    pub form_type: String,
    pub file_number: String,
    pub period_of_report: NaiveDate,
    /// Signature date; at most ~45 days after the period of report.
    pub filing_date: NaiveDate,
}

/// Result of parsing one filing document: metadata plus its holdings,
/// already stamped with the filer's CIK and report date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedFiling {
    pub metadata: FilingMetadata,
    pub holdings: Vec<HoldingRecord>,
}
