use crate::error::{ReportEngineError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Extension a file must carry to be picked up as a ledger source.
pub const LEDGER_FILE_EXTENSION: &str = "csv";

/// Job name of the parent task submitted alongside the three report children.
pub const GENERATE_ALL_JOB_NAME: &str = "generate-all";

pub const ACCOUNTS_REPORT_FILE_NAME: &str = "accounts.csv";
pub const YEARLY_REPORT_FILE_NAME: &str = "yearly.csv";
pub const STATEMENT_REPORT_FILE_NAME: &str = "fs.csv";

/// The account name whose entries feed the yearly cash-flow report.
pub const CASH_ACCOUNT: &str = "Cash";

/// The three derived reports the engine can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    Accounts,
    Yearly,
    FinancialStatement,
}

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [
        ReportKind::Accounts,
        ReportKind::Yearly,
        ReportKind::FinancialStatement,
    ];

    /// Name used when this report runs as a queued job.
    pub fn job_name(&self) -> &'static str {
        match self {
            ReportKind::Accounts => "accounts",
            ReportKind::Yearly => "yearly",
            ReportKind::FinancialStatement => "financial-statement",
        }
    }

    pub fn from_job_name(name: &str) -> Result<Self> {
        match name {
            "accounts" => Ok(ReportKind::Accounts),
            "yearly" => Ok(ReportKind::Yearly),
            "financial-statement" => Ok(ReportKind::FinancialStatement),
            other => Err(ReportEngineError::UnknownJob(other.to_string())),
        }
    }

    /// File name the report is written to, overwritten on each run.
    pub fn output_file_name(&self) -> &'static str {
        match self {
            ReportKind::Accounts => ACCOUNTS_REPORT_FILE_NAME,
            ReportKind::Yearly => YEARLY_REPORT_FILE_NAME,
            ReportKind::FinancialStatement => STATEMENT_REPORT_FILE_NAME,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.job_name())
    }
}

/// How strictly numeric and date fields are parsed.
///
/// `Lenient` is the historical behavior of the extracts this engine was built
/// for: empty or non-numeric debit/credit fields count as zero, and a row
/// whose date cannot be parsed is skipped where the date matters (the yearly
/// report). `Strict` turns both cases into [`ReportEngineError::MalformedRow`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParsePolicy {
    #[default]
    Lenient,
    Strict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEngineConfig {
    /// Directory scanned for ledger source files.
    pub source_dir: PathBuf,
    /// Directory report files are written to.
    pub output_dir: PathBuf,
    #[serde(default)]
    pub parsing: ParsePolicy,
}

impl Default for ReportEngineConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("tmp"),
            output_dir: PathBuf::from("out"),
            parsing: ParsePolicy::default(),
        }
    }
}

impl ReportEngineConfig {
    pub fn output_path(&self, kind: ReportKind) -> PathBuf {
        self.output_dir.join(kind.output_file_name())
    }
}

/// One parsed row of a ledger source file. Ephemeral: exists only within a
/// single aggregation pass, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub date: String,
    pub account: String,
    pub debit: f64,
    pub credit: f64,
}

impl LedgerEntry {
    /// Parses a comma-separated row of `date, account, description, debit,
    /// credit`. The description field is ignored; rows with fewer fields
    /// yield empty strings for the missing positions. Note that source files
    /// carry no header row, so the first line is data like any other.
    pub fn parse(line: &str, policy: ParsePolicy) -> Result<Self> {
        let mut fields = line.split(',');
        let date = fields.next().unwrap_or("").trim().to_string();
        let account = fields.next().unwrap_or("").trim().to_string();
        let _description = fields.next();
        let debit = parse_amount(fields.next().unwrap_or(""), line, policy)?;
        let credit = parse_amount(fields.next().unwrap_or(""), line, policy)?;

        Ok(Self {
            date,
            account,
            debit,
            credit,
        })
    }

    /// Signed contribution of this entry: debit minus credit.
    pub fn balance(&self) -> f64 {
        self.debit - self.credit
    }

    /// Calendar year of the entry's date, if the date parses. Accepts the
    /// handful of formats seen in real extracts.
    pub fn year(&self) -> Option<i32> {
        parse_entry_date(&self.date).map(|d| chrono::Datelike::year(&d))
    }
}

fn parse_amount(raw: &str, line: &str, policy: ParsePolicy) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    match trimmed.parse::<f64>() {
        Ok(value) => Ok(value),
        Err(_) => match policy {
            ParsePolicy::Lenient => Ok(0.0),
            ParsePolicy::Strict => Err(ReportEngineError::MalformedRow {
                row: line.to_string(),
                details: format!("non-numeric amount '{}'", trimmed),
            }),
        },
    }
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

pub fn parse_entry_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}
