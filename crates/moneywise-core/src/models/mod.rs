//! Data models for the MoneyWise API.
//!
//! - `Goal`, `NewGoal`, `AmountUpdate`: savings goals and deposits
//! - `Finance`, `Income`, `Expense`: the user's ledger
//! - `UserProfile`, `RegisterData`: account data

pub mod finance;
pub mod goal;
pub mod user;

pub use finance::{Expense, Finance, Income, NewExpense, NewIncome, TransactionKind};
pub use goal::{AmountUpdate, Goal, NewGoal};
pub use user::{RegisterData, UserProfile};

use serde::Deserialize;

/// Generic `{success, message}` acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

// Amounts come back from the database as numeric strings ("1250.00") or numbers
pub(crate) fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct AmountVisitor;

    impl<'de> de::Visitor<'de> for AmountVisitor {
        type Value = f64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a number or numeric string")
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v as f64)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v as f64)
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                return Ok(0.0);
            }
            trimmed
                .parse()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E> {
            Ok(0.0)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(0.0)
        }
    }

    deserializer.deserialize_any(AmountVisitor)
}
