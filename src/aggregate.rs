use crate::error::{ReportEngineError, Result};
use crate::schema::{LedgerEntry, ParsePolicy, CASH_ACCOUNT};
use crate::statement::StatementLayout;
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// Account -> balance table that iterates in insertion order.
///
/// First-seen order across the source file sequence is the accounts report's
/// line-order contract, so the table keeps an entry vector alongside a key
/// index rather than relying on any map's iteration order.
#[derive(Debug, Clone, Default)]
pub struct AccountBalances {
    entries: Vec<(String, f64)>,
    index: HashMap<String, usize>,
}

impl AccountBalances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount` to the account's balance, creating the account at the
    /// end of the iteration order if it has not been seen before.
    pub fn add(&mut self, account: &str, amount: f64) {
        match self.index.get(account) {
            Some(&slot) => self.entries[slot].1 += amount,
            None => {
                self.index.insert(account.to_string(), self.entries.len());
                self.entries.push((account.to_string(), amount));
            }
        }
    }

    pub fn get(&self, account: &str) -> Option<f64> {
        self.index.get(account).map(|&slot| self.entries[slot].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All three accumulators, populated together by [`aggregate_all`]'s single
/// combined pass.
#[derive(Debug, Clone)]
pub struct LedgerTotals {
    pub accounts: AccountBalances,
    pub cash_by_year: BTreeMap<i32, f64>,
    pub statement: HashMap<String, f64>,
}

fn for_each_entry<F>(contents: &[String], policy: ParsePolicy, mut fold: F) -> Result<()>
where
    F: FnMut(LedgerEntry) -> Result<()>,
{
    for content in contents {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            continue;
        }
        for line in trimmed.split('\n') {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            fold(LedgerEntry::parse(line, policy)?)?;
        }
    }
    Ok(())
}

fn fold_yearly(
    table: &mut BTreeMap<i32, f64>,
    entry: &LedgerEntry,
    policy: ParsePolicy,
) -> Result<()> {
    if entry.account != CASH_ACCOUNT {
        return Ok(());
    }
    match entry.year() {
        Some(year) => {
            *table.entry(year).or_insert(0.0) += entry.balance();
            Ok(())
        }
        // Unparseable date: the row cannot be attributed to a year.
        None => match policy {
            ParsePolicy::Lenient => Ok(()),
            ParsePolicy::Strict => Err(ReportEngineError::MalformedRow {
                row: format!("{},{}", entry.date, entry.account),
                details: format!("unparseable date '{}'", entry.date),
            }),
        },
    }
}

fn fold_statement(table: &mut HashMap<String, f64>, entry: &LedgerEntry) {
    // Only pre-seeded accounts participate; anything else is dropped.
    if let Some(balance) = table.get_mut(&entry.account) {
        *balance += entry.balance();
    }
}

/// Folds every row into an account -> balance table, creating accounts as
/// they are first seen.
pub fn aggregate_accounts(contents: &[String], policy: ParsePolicy) -> Result<AccountBalances> {
    let mut table = AccountBalances::new();
    for_each_entry(contents, policy, |entry| {
        table.add(&entry.account, entry.balance());
        Ok(())
    })?;
    debug!("Aggregated balances for {} account(s)", table.len());
    Ok(table)
}

/// Folds the `Cash` rows into a year -> balance table. Ascending key order
/// falls out of the map type.
pub fn aggregate_yearly(contents: &[String], policy: ParsePolicy) -> Result<BTreeMap<i32, f64>> {
    let mut table = BTreeMap::new();
    for_each_entry(contents, policy, |entry| {
        fold_yearly(&mut table, &entry, policy)
    })?;
    debug!("Aggregated cash balances for {} year(s)", table.len());
    Ok(table)
}

/// Folds rows into the statement layout's pre-seeded balances. Accounts
/// outside the category tree are dropped, not added.
pub fn aggregate_statement(
    layout: &StatementLayout,
    contents: &[String],
    policy: ParsePolicy,
) -> Result<HashMap<String, f64>> {
    let mut table = layout.seeded_balances();
    for_each_entry(contents, policy, |entry| {
        fold_statement(&mut table, &entry);
        Ok(())
    })?;
    Ok(table)
}

/// One combined pass populating all three accumulators at once, so a
/// generate-everything run shares a single parse of every row.
pub fn aggregate_all(
    layout: &StatementLayout,
    contents: &[String],
    policy: ParsePolicy,
) -> Result<LedgerTotals> {
    let mut totals = LedgerTotals {
        accounts: AccountBalances::new(),
        cash_by_year: BTreeMap::new(),
        statement: layout.seeded_balances(),
    };

    for_each_entry(contents, policy, |entry| {
        totals.accounts.add(&entry.account, entry.balance());
        fold_yearly(&mut totals.cash_by_year, &entry, policy)?;
        fold_statement(&mut totals.statement, &entry);
        Ok(())
    })?;

    Ok(totals)
}
