use crate::aggregate::{aggregate_accounts, aggregate_all, aggregate_statement, aggregate_yearly};
use crate::error::Result;
use crate::format;
use crate::schema::{ReportEngineConfig, ReportKind};
use crate::sources::{list_sources, read_all, write_report};
use crate::statement::StatementLayout;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Where a report task currently is, queryable per kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaskState {
    Idle,
    Starting,
    Finished { seconds: f64 },
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Idle => f.write_str("idle"),
            TaskState::Starting => f.write_str("starting"),
            TaskState::Finished { seconds } => write!(f, "finished in {:.2} seconds", seconds),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunOutcome {
    pub duration: Duration,
}

impl RunOutcome {
    pub fn duration_seconds(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}

/// Executes one report-generation task end to end: read sources, aggregate,
/// format, write. Also the execution core behind the queued jobs, so both
/// the synchronous and the asynchronous paths share one implementation.
pub struct ReportRunner {
    config: ReportEngineConfig,
    layout: StatementLayout,
    states: Mutex<HashMap<ReportKind, TaskState>>,
}

impl ReportRunner {
    pub fn new(config: ReportEngineConfig, layout: StatementLayout) -> Self {
        let duplicates = layout.validate();
        if !duplicates.is_empty() {
            // A repeated account lands in more than one group total.
            warn!(
                "Statement layout repeats account(s): {}",
                duplicates.join(", ")
            );
        }

        Self {
            config,
            layout,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ReportEngineConfig {
        &self.config
    }

    /// Current state of one report task. `Idle` until the first run.
    pub fn state(&self, kind: ReportKind) -> TaskState {
        self.states
            .lock()
            .unwrap()
            .get(&kind)
            .copied()
            .unwrap_or(TaskState::Idle)
    }

    fn set_state(&self, kind: ReportKind, state: TaskState) {
        self.states.lock().unwrap().insert(kind, state);
    }

    /// Runs a single report kind. The task's own output file is excluded
    /// from the source listing so a rerun never ingests its previous result.
    pub async fn run(&self, kind: ReportKind) -> Result<RunOutcome> {
        info!("Generating {} report", kind);
        self.set_state(kind, TaskState::Starting);
        let started = Instant::now();

        match self.execute(kind).await {
            Ok(()) => {
                let duration = started.elapsed();
                self.set_state(
                    kind,
                    TaskState::Finished {
                        seconds: duration.as_secs_f64(),
                    },
                );
                Ok(RunOutcome { duration })
            }
            Err(err) => {
                // Back to idle so the failed task is observable and
                // re-runnable instead of stuck at `starting`.
                self.set_state(kind, TaskState::Idle);
                Err(err)
            }
        }
    }

    /// Generates all three reports from one shared directory listing and one
    /// shared set of file reads, aggregating in a single combined pass.
    pub async fn run_all(&self) -> Result<RunOutcome> {
        info!("Generating all reports in one pass");
        for kind in ReportKind::ALL {
            self.set_state(kind, TaskState::Starting);
        }
        let started = Instant::now();

        let result = self.execute_all().await;
        match result {
            Ok(()) => {
                let duration = started.elapsed();
                for kind in ReportKind::ALL {
                    self.set_state(
                        kind,
                        TaskState::Finished {
                            seconds: duration.as_secs_f64(),
                        },
                    );
                }
                Ok(RunOutcome { duration })
            }
            Err(err) => {
                for kind in ReportKind::ALL {
                    self.set_state(kind, TaskState::Idle);
                }
                Err(err)
            }
        }
    }

    async fn load_sources(&self, excluding: &[&str]) -> Result<Vec<String>> {
        let paths = list_sources(&self.config.source_dir, excluding).await?;
        read_all(&paths).await
    }

    async fn execute(&self, kind: ReportKind) -> Result<()> {
        let contents = self.load_sources(&[kind.output_file_name()]).await?;
        debug!("Aggregating {} source file(s) for {}", contents.len(), kind);
        let policy = self.config.parsing;

        let lines = match kind {
            ReportKind::Accounts => {
                format::accounts_report(&aggregate_accounts(&contents, policy)?)
            }
            ReportKind::Yearly => format::yearly_report(&aggregate_yearly(&contents, policy)?),
            ReportKind::FinancialStatement => format::statement_report(
                &self.layout,
                &aggregate_statement(&self.layout, &contents, policy)?,
            ),
        };

        write_report(&self.config.output_path(kind), &lines).await
    }

    async fn execute_all(&self) -> Result<()> {
        let excluded: Vec<&str> = ReportKind::ALL
            .iter()
            .map(|kind| kind.output_file_name())
            .collect();
        let contents = self.load_sources(&excluded).await?;

        let totals = aggregate_all(&self.layout, &contents, self.config.parsing)?;

        write_report(
            &self.config.output_path(ReportKind::Accounts),
            &format::accounts_report(&totals.accounts),
        )
        .await?;
        write_report(
            &self.config.output_path(ReportKind::Yearly),
            &format::yearly_report(&totals.cash_by_year),
        )
        .await?;
        write_report(
            &self.config.output_path(ReportKind::FinancialStatement),
            &format::statement_report(&self.layout, &totals.statement),
        )
        .await
    }
}
