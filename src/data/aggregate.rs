//! Group-and-count statistics over the call table.

use crate::data::loader::Table;
use crate::data::schema::CallSchema;
use crate::error::{InsightsError, InsightsResult};
use crate::logging::log_debug;

use std::cmp::Ordering;
use std::collections::HashMap;

/// Text used in place of the attempt table when the column is absent
pub const ATTEMPT_NOT_AVAILABLE: &str = "Attempt number data not available.";

/// One `(key, count)` pair of a ranked aggregate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateRow {
    pub key: String,
    pub count: u64,
}

impl AggregateRow {
    pub fn new(key: impl Into<String>, count: u64) -> Self {
        Self {
            key: key.into(),
            count,
        }
    }
}

/// Per-attempt counts, or the sentinel when the calls table has no attempt column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptBreakdown {
    Available(Vec<AggregateRow>),
    NotAvailable,
}

impl AttemptBreakdown {
    pub fn rows(&self) -> Option<&[AggregateRow]> {
        match self {
            Self::Available(rows) => Some(rows),
            Self::NotAvailable => None,
        }
    }
}

/// Derived call statistics, recomputed on every load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallAggregates {
    pub total_calls: u64,
    pub by_agent: Vec<AggregateRow>,
    pub by_campaign: Vec<AggregateRow>,
    pub by_attempt: AttemptBreakdown,
}

/// Count rows per distinct value of `column`, ranked by count descending
/// and then key ascending, so equal inputs always rank identically.
/// Integer keys (attempt numbers) compare numerically and rank before text keys.
///
/// # Errors
///
/// Returns [`InsightsError::MissingColumn`] if `column` is not in `table`.
pub fn count_by(table: &Table, column: &str) -> InsightsResult<Vec<AggregateRow>> {
    let values = table
        .column_values(column)
        .ok_or_else(|| InsightsError::missing_column(table.name(), column))?;

    let mut counts: HashMap<&str, u64> = HashMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut rows: Vec<AggregateRow> = counts
        .into_iter()
        .map(|(key, count)| AggregateRow::new(key, count))
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| compare_keys(&a.key, &b.key)));

    Ok(rows)
}

/// Integer keys first, by value; everything else after, by text
fn compare_keys(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<i64>().ok(), b.trim().parse::<i64>().ok()) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Compute per-agent, per-campaign and per-attempt counts.
///
/// The attempt column is optional: when it is absent the breakdown is
/// [`AttemptBreakdown::NotAvailable`] and the other aggregates still succeed.
///
/// # Errors
///
/// Returns [`InsightsError::MissingColumn`] if the agent or campaign column
/// is missing.
pub fn aggregate_calls(calls: &Table, schema: &CallSchema) -> InsightsResult<CallAggregates> {
    let by_agent = count_by(calls, &schema.agent_column)?;
    let by_campaign = count_by(calls, &schema.campaign_column)?;
    let by_attempt = if calls.column_index(&schema.attempt_column).is_some() {
        AttemptBreakdown::Available(count_by(calls, &schema.attempt_column)?)
    } else {
        log_debug!(
            column = %schema.attempt_column,
            "Attempt column absent, using sentinel"
        );
        AttemptBreakdown::NotAvailable
    };

    log_debug!(
        total_calls = calls.len(),
        agents = by_agent.len(),
        campaigns = by_campaign.len(),
        attempts = by_attempt.rows().map(<[AggregateRow]>::len),
        "Call aggregates computed"
    );

    Ok(CallAggregates {
        total_calls: calls.len() as u64,
        by_agent,
        by_campaign,
        by_attempt,
    })
}
