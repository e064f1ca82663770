use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The fixed Section -> Group -> accounts taxonomy behind the financial
/// statement. Group vectors are in report line order; the layout is
/// configuration, not runtime state.
///
/// Invariant: an account name appears in at most one group. [`Self::validate`]
/// checks this; the aggregation pass relies on it when it folds a row into
/// the single seeded balance for its account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementLayout {
    pub revenues: Vec<String>,
    pub expenses: Vec<String>,
    pub assets: Vec<String>,
    pub liabilities: Vec<String>,
    pub equity: Vec<String>,
}

impl Default for StatementLayout {
    fn default() -> Self {
        Self::standard()
    }
}

impl StatementLayout {
    /// The standard small-business chart this engine has always reported on.
    pub fn standard() -> Self {
        let names = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();

        Self {
            revenues: names(&["Sales Revenue"]),
            expenses: names(&[
                "Cost of Goods Sold",
                "Salaries Expense",
                "Rent Expense",
                "Utilities Expense",
                "Interest Expense",
                "Tax Expense",
            ]),
            assets: names(&[
                "Cash",
                "Accounts Receivable",
                "Inventory",
                "Fixed Assets",
                "Prepaid Expenses",
            ]),
            liabilities: names(&[
                "Accounts Payable",
                "Loan Payable",
                "Sales Tax Payable",
                "Accrued Liabilities",
                "Unearned Revenue",
                "Dividends Payable",
            ]),
            equity: names(&["Common Stock", "Retained Earnings"]),
        }
    }

    /// All account names in tree order.
    pub fn accounts(&self) -> impl Iterator<Item = &str> {
        self.revenues
            .iter()
            .chain(self.expenses.iter())
            .chain(self.assets.iter())
            .chain(self.liabilities.iter())
            .chain(self.equity.iter())
            .map(String::as_str)
    }

    /// Zero balance for every account in the tree. Aggregation only ever
    /// updates keys that exist here; unknown accounts are dropped.
    pub fn seeded_balances(&self) -> HashMap<String, f64> {
        self.accounts().map(|name| (name.to_string(), 0.0)).collect()
    }

    /// Returns the duplicated account names, if any. An empty result means
    /// the uniqueness invariant holds.
    pub fn validate(&self) -> Vec<String> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for name in self.accounts() {
            *seen.entry(name).or_insert(0) += 1;
        }

        let mut duplicates: Vec<String> = seen
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, _)| name.to_string())
            .collect();
        duplicates.sort();
        duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_layout_is_unique() {
        let layout = StatementLayout::standard();
        assert!(layout.validate().is_empty());
    }

    #[test]
    fn test_seeded_balances_cover_tree() {
        let layout = StatementLayout::standard();
        let balances = layout.seeded_balances();
        assert_eq!(balances.len(), layout.accounts().count());
        assert_eq!(balances.get("Cash"), Some(&0.0));
        assert_eq!(balances.get("Retained Earnings"), Some(&0.0));
        assert!(!balances.contains_key("Petty Cash"));
    }

    #[test]
    fn test_validate_reports_duplicates() {
        let mut layout = StatementLayout::standard();
        layout.equity.push("Cash".to_string());
        assert_eq!(layout.validate(), vec!["Cash".to_string()]);
    }
}
