use serde::{Deserialize, Serialize};

use super::deserialize_amount;

/// A savings goal as stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Goal {
    #[serde(default)]
    pub id_goal: Option<i64>,
    #[serde(default)]
    pub id_user: Option<i64>,
    pub goal_name: String,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub target_amount: f64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub current_amount: f64,
    #[serde(default)]
    pub deadline: Option<String>,
}

impl Goal {
    /// Saved share of the target, capped at 100.
    pub fn progress_percent(&self) -> u8 {
        if self.target_amount <= 0.0 {
            return 0;
        }
        let pct = (self.current_amount / self.target_amount * 100.0).floor();
        pct.clamp(0.0, 100.0) as u8
    }

    pub fn remaining(&self) -> f64 {
        (self.target_amount - self.current_amount).max(0.0)
    }

    pub fn is_reached(&self) -> bool {
        self.target_amount > 0.0 && self.current_amount >= self.target_amount
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GoalsResponse {
    #[serde(default)]
    pub goals: Vec<Goal>,
}

/// Body of the create-goal call.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NewGoal {
    pub id_user: i64,
    pub goal_name: String,
    pub target_amount: f64,
    pub current_amount: f64,
    pub deadline: String,
}

/// Deposit into an existing goal.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AmountUpdate {
    pub id_goal: i64,
    pub new_amount: f64,
}
