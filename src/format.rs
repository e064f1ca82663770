use crate::aggregate::AccountBalances;
use crate::statement::StatementLayout;
use std::collections::{BTreeMap, HashMap};

pub const STATEMENT_TITLE: &str = "Basic Financial Statement";

/// Trial-balance report: one line per account in first-seen order.
pub fn accounts_report(balances: &AccountBalances) -> Vec<String> {
    let mut output = vec!["Account,Balance".to_string()];
    for (account, balance) in balances.iter() {
        output.push(format!("{},{:.2}", account, balance));
    }
    output
}

/// Yearly cash-flow report, ascending by year.
pub fn yearly_report(cash_by_year: &BTreeMap<i32, f64>) -> Vec<String> {
    let mut output = vec!["Financial Year,Cash Balance".to_string()];
    for (year, balance) in cash_by_year {
        output.push(format!("{},{:.2}", year, balance));
    }
    output
}

/// Categorized financial statement: income statement followed by balance
/// sheet, in the layout's fixed line order.
///
/// The closing `Assets = Liabilities + Equity` line is diagnostic. When the
/// supplied data is balanced the two sides agree; when it is not, the report
/// still renders and the discrepancy is visible on that line.
pub fn statement_report(layout: &StatementLayout, balances: &HashMap<String, f64>) -> Vec<String> {
    let value_of = |account: &str| balances.get(account).copied().unwrap_or(0.0);

    let mut output = Vec::new();
    output.push(STATEMENT_TITLE.to_string());
    output.push(String::new());

    output.push("Income Statement".to_string());
    let mut total_revenue = 0.0;
    let mut total_expenses = 0.0;
    for account in &layout.revenues {
        let value = value_of(account);
        output.push(format!("{},{:.2}", account, value));
        total_revenue += value;
    }
    for account in &layout.expenses {
        let value = value_of(account);
        output.push(format!("{},{:.2}", account, value));
        total_expenses += value;
    }
    let net_income = total_revenue - total_expenses;
    output.push(format!("Net Income,{:.2}", net_income));

    output.push(String::new());
    output.push("Balance Sheet".to_string());

    output.push("Assets".to_string());
    let mut total_assets = 0.0;
    for account in &layout.assets {
        let value = value_of(account);
        output.push(format!("{},{:.2}", account, value));
        total_assets += value;
    }
    output.push(format!("Total Assets,{:.2}", total_assets));

    output.push(String::new());
    output.push("Liabilities".to_string());
    let mut total_liabilities = 0.0;
    for account in &layout.liabilities {
        let value = value_of(account);
        output.push(format!("{},{:.2}", account, value));
        total_liabilities += value;
    }
    output.push(format!("Total Liabilities,{:.2}", total_liabilities));

    output.push(String::new());
    output.push("Equity".to_string());
    let mut total_equity = 0.0;
    for account in &layout.equity {
        let value = value_of(account);
        output.push(format!("{},{:.2}", account, value));
        total_equity += value;
    }
    output.push(format!("Retained Earnings (Net Income),{:.2}", net_income));
    total_equity += net_income;
    output.push(format!("Total Equity,{:.2}", total_equity));

    output.push(String::new());
    output.push(format!(
        "Assets = Liabilities + Equity, {:.2} = {:.2}",
        total_assets,
        total_liabilities + total_equity
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_statement;
    use crate::schema::ParsePolicy;

    #[test]
    fn test_accounts_report_lines() {
        let mut balances = AccountBalances::new();
        balances.add("Cash", 120.0);
        balances.add("Sales Revenue", -100.0);

        let lines = accounts_report(&balances);
        assert_eq!(
            lines,
            vec!["Account,Balance", "Cash,120.00", "Sales Revenue,-100.00"]
        );
    }

    #[test]
    fn test_yearly_report_sorted_ascending() {
        let mut table = BTreeMap::new();
        table.insert(2024, -30.0);
        table.insert(2023, 150.0);

        let lines = yearly_report(&table);
        assert_eq!(
            lines,
            vec!["Financial Year,Cash Balance", "2023,150.00", "2024,-30.00"]
        );
    }

    #[test]
    fn test_statement_report_shape() {
        let layout = StatementLayout::standard();
        let balances = layout.seeded_balances();
        let lines = statement_report(&layout, &balances);

        assert_eq!(lines[0], STATEMENT_TITLE);
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "Income Statement");
        assert!(lines.contains(&"Net Income,0.00".to_string()));
        assert!(lines.contains(&"Balance Sheet".to_string()));
        assert!(lines.contains(&"Total Assets,0.00".to_string()));
        assert!(lines.contains(&"Total Liabilities,0.00".to_string()));
        assert!(lines.contains(&"Retained Earnings (Net Income),0.00".to_string()));
        assert_eq!(
            lines.last().unwrap(),
            "Assets = Liabilities + Equity, 0.00 = 0.00"
        );
    }

    #[test]
    fn test_statement_identity_holds_for_balanced_books() {
        // Extracts record increases in the debit column and decreases in the
        // credit column, so a balanced history keeps the expanded equation
        // Assets = Liabilities + Equity + Revenue - Expenses intact.
        let layout = StatementLayout::standard();
        let files = vec![
            // Owner funds the company: Cash +500, Common Stock +500.
            "2023-01-01,Cash,,500.00,0\n2023-01-01,Common Stock,,500.00,0".to_string(),
            // A cash sale: Cash +200, Sales Revenue +200.
            "2023-02-01,Cash,,200.00,0\n2023-02-01,Sales Revenue,,200.00,0".to_string(),
            // Rent paid in cash: Rent Expense +50, Cash -50.
            "2023-03-01,Rent Expense,,50.00,0\n2023-03-01,Cash,,0,50.00".to_string(),
        ];
        let balances = aggregate_statement(&layout, &files, ParsePolicy::Lenient).unwrap();
        let lines = statement_report(&layout, &balances);

        // Assets: cash 650. Equity: stock 500 plus net income 150.
        assert!(lines.contains(&"Total Assets,650.00".to_string()));
        assert!(lines.contains(&"Net Income,150.00".to_string()));
        assert!(lines.contains(&"Total Equity,650.00".to_string()));

        let closing = lines.last().unwrap();
        assert_eq!(closing, "Assets = Liabilities + Equity, 650.00 = 650.00");
        let (_, sides) = closing.split_once(", ").unwrap();
        let (left, right) = sides.split_once(" = ").unwrap();
        assert!((left.parse::<f64>().unwrap() - right.parse::<f64>().unwrap()).abs() < 0.005);
    }

    #[test]
    fn test_statement_renders_even_when_identity_broken() {
        let layout = StatementLayout::standard();
        let files = vec!["2023-01-01,Cash,,999.00,0".to_string()];
        let balances = aggregate_statement(&layout, &files, ParsePolicy::Lenient).unwrap();
        let lines = statement_report(&layout, &balances);

        // One-sided entry: the two sides differ and the line just reports it.
        assert_eq!(
            lines.last().unwrap(),
            "Assets = Liabilities + Equity, 999.00 = 0.00"
        );
    }
}
