//! Savings goal endpoints.

use crate::models::goal::GoalsResponse;
use crate::models::{AmountUpdate, Goal, NewGoal, StatusResponse};

use super::{ApiError, SessionClient};

impl SessionClient {
    pub async fn fetch_goals(&self, user_id: i64) -> Result<Vec<Goal>, ApiError> {
        let response: GoalsResponse = self.get(&format!("/goals/getGoals/{}", user_id)).await?;
        Ok(response.goals)
    }

    pub async fn create_goal(&self, goal: &NewGoal) -> Result<Goal, ApiError> {
        self.post("/goals/creategoal", goal).await
    }

    /// Add `new_amount` to a goal's saved total.
    pub async fn deposit_to_goal(&self, update: &AmountUpdate) -> Result<StatusResponse, ApiError> {
        self.put("/goals/updateAmount", update).await
    }

    pub async fn delete_goal(&self, goal_id: i64) -> Result<StatusResponse, ApiError> {
        self.delete(&format!("/goals/deleteGoal/{}", goal_id)).await
    }
}
