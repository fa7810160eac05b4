//! Column names of the call table.
//!
//! The source datasets carry no contract for their schema, so the columns
//! the aggregator reads are configuration rather than literals.

use serde::{Deserialize, Serialize};

/// Which columns of the calls table hold the grouping keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSchema {
    /// Required: agent identifier
    pub agent_column: String,
    /// Required: campaign identifier
    pub campaign_column: String,
    /// Optional: dial attempt ordinal. Absence degrades to a sentinel.
    pub attempt_column: String,
}

impl Default for CallSchema {
    fn default() -> Self {
        Self {
            agent_column: "agent_id".to_string(),
            campaign_column: "campaign_id".to_string(),
            attempt_column: "attempt_number".to_string(),
        }
    }
}
