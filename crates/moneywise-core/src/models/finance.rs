use serde::{Deserialize, Serialize};

use super::deserialize_amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Income,
    Expense,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Income {
    #[serde(default)]
    pub id_income: Option<i64>,
    pub income_name: String,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub amount: f64,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Expense {
    #[serde(default)]
    pub id_expense: Option<i64>,
    pub expense_name: String,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub amount: f64,
    #[serde(default)]
    pub icon: Option<String>,
}

/// A user's ledger: salary plus recorded incomes and expenses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Finance {
    pub id_finance: i64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub current_salary: f64,
    #[serde(default)]
    pub incomes: Vec<Income>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
}

impl Finance {
    pub fn total_income(&self) -> f64 {
        self.incomes.iter().map(|i| i.amount).sum()
    }

    pub fn total_expenses(&self) -> f64 {
        self.expenses.iter().map(|e| e.amount).sum()
    }

    pub fn balance(&self) -> f64 {
        self.total_income() - self.total_expenses()
    }

    /// Every entry as (kind, name, amount), incomes first.
    pub fn transactions(&self) -> Vec<(TransactionKind, &str, f64)> {
        self.incomes
            .iter()
            .map(|i| (TransactionKind::Income, i.income_name.as_str(), i.amount))
            .chain(
                self.expenses
                    .iter()
                    .map(|e| (TransactionKind::Expense, e.expense_name.as_str(), e.amount)),
            )
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FinanceResponse {
    pub finance: Finance,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NewIncome {
    pub id_finance: i64,
    pub income_name: String,
    pub amount: f64,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NewExpense {
    pub id_finance: i64,
    pub expense_name: String,
    pub amount: f64,
    pub icon: String,
}
