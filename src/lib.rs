//! # Ledger Report Engine
//!
//! A library for turning raw accounting-ledger extracts (comma-separated
//! rows of `date, account, description, debit, credit`) into three derived
//! reports:
//!
//! - **Accounts** — a per-account trial balance, accumulated as debit minus
//!   credit, in first-seen account order
//! - **Yearly** — cash balance per calendar year, ascending
//! - **Financial statement** — a categorized income statement and balance
//!   sheet over a fixed Section → Group → account taxonomy, closed by the
//!   diagnostic identity line `Assets = Liabilities + Equity`
//!
//! Generation runs in one of two modes over the same aggregation core: a
//! synchronous single pass ([`ReportRunner::run_all`]) that shares one set
//! of file reads across all three reports, or an asynchronous flow
//! ([`ReportOrchestrator::generate_all`]) that submits one parent job plus
//! three independent children to a job queue and lets attached workers
//! execute them concurrently. Flow progress is queryable at any time via
//! [`ReportOrchestrator::flow_status`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use ledger_report_engine::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<()> {
//! let config = ReportEngineConfig::default();
//!
//! // Synchronous: one combined pass, three report files.
//! generate_reports(&config).await?;
//!
//! // Asynchronous: submit a flow and poll its status.
//! let queue = Arc::new(MemoryJobQueue::new());
//! let runner = Arc::new(ReportRunner::new(config, StatementLayout::standard()));
//! ReportWorker::spawn(queue.clone(), runner);
//!
//! let orchestrator = ReportOrchestrator::new(queue);
//! let flow_id = orchestrator.generate_all().await?;
//! let statuses = orchestrator.flow_status(&flow_id).await?;
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod error;
pub mod flow;
pub mod format;
pub mod queue;
pub mod runner;
pub mod schema;
pub mod sources;
pub mod statement;
pub mod worker;

pub use aggregate::{
    aggregate_accounts, aggregate_all, aggregate_statement, aggregate_yearly, AccountBalances,
    LedgerTotals,
};
pub use error::{ReportEngineError, Result};
pub use flow::{ChildStatus, ReportOrchestrator};
pub use format::{accounts_report, statement_report, yearly_report};
pub use queue::{FlowNode, JobQueue, JobRecord, JobSpec, JobState, MemoryJobQueue};
pub use runner::{ReportRunner, RunOutcome, TaskState};
pub use schema::{
    LedgerEntry, ParsePolicy, ReportEngineConfig, ReportKind, GENERATE_ALL_JOB_NAME,
};
pub use sources::{list_sources, read_all, write_report};
pub use statement::StatementLayout;
pub use worker::ReportWorker;

/// Generates all three reports synchronously in one combined pass, writing
/// them to the configured output directory.
pub async fn generate_reports(config: &ReportEngineConfig) -> Result<RunOutcome> {
    let runner = ReportRunner::new(config.clone(), StatementLayout::standard());
    runner.run_all().await
}

/// Generates a single report kind synchronously.
pub async fn generate_report(config: &ReportEngineConfig, kind: ReportKind) -> Result<RunOutcome> {
    let runner = ReportRunner::new(config.clone(), StatementLayout::standard());
    runner.run(kind).await
}
