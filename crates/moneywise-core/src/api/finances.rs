//! Income and expense endpoints.

use serde_json::Value;

use crate::models::finance::FinanceResponse;
use crate::models::{Finance, NewExpense, NewIncome};

use super::{ApiError, SessionClient};

impl SessionClient {
    pub async fn fetch_finance(&self, user_id: i64) -> Result<Finance, ApiError> {
        let response: FinanceResponse = self
            .get(&format!("/finance/getFinances/{}", user_id))
            .await?;
        Ok(response.finance)
    }

    pub async fn create_income(&self, income: &NewIncome) -> Result<Value, ApiError> {
        self.post("/income/createIncome", income).await
    }

    pub async fn create_expense(&self, expense: &NewExpense) -> Result<Value, ApiError> {
        self.post("/expense/createExpense", expense).await
    }
}
