//! Grounding context for the generation service.
//!
//! The system instruction combines fixed KPI figures from the assessment
//! with the shape of each loaded table and the call aggregates. Only schemas
//! and derived statistics are included, never raw rows: each aggregate table
//! is cut to `max_rows_per_table` entries so the payload stays small however
//! large the datasets are.
//!
//! Building is a pure function of its inputs and is repeated for every
//! request; nothing is cached between turns.

use crate::config::ContextConfig;
use crate::data::{
    AggregateRow, AttemptBreakdown, CallAggregates, TableShape, ATTEMPT_NOT_AVAILABLE,
};
use crate::logging::log_trace;

const PERSONA: &str = "You are the Senior Data Assistant for the telesales team. \
You have complete knowledge of the end-to-end performance assessment.";

const ANSWER_STYLE: &str = "Be concise, highly analytical, and reference specific data points \
when answering. If a figure is not in this context, say so instead of estimating it.";

const NO_DATASETS: &str =
    "CALL STATISTICS: the raw datasets are not loaded; answer from the headline figures above.";

const NO_CALL_STATISTICS: &str = "CALL STATISTICS: the calls table lacks the agent or campaign \
column; answer from the headline figures above.";

/// A labelled headline figure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KpiFigure {
    pub label: String,
    pub value: String,
}

impl KpiFigure {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A titled block of figures, e.g. one reporting period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KpiSection {
    pub title: String,
    pub figures: Vec<KpiFigure>,
}

/// Fixed figures and conclusions the assistant always knows about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KpiSnapshot {
    pub sections: Vec<KpiSection>,
    pub insights: Vec<String>,
}

impl Default for KpiSnapshot {
    fn default() -> Self {
        let four_week = KpiSection {
            title: "PHASE 1: EXCEL (Last 4 Weeks Snapshot - Aug 7 to Sept 4)".to_string(),
            figures: vec![
                KpiFigure::new("Total Calls", "2,915"),
                KpiFigure::new("Connect Rate", "46.03% (1,342 connects)"),
                KpiFigure::new("Avg Talk Time", "123 seconds (measured on connected calls only)"),
                KpiFigure::new("Conversion Rate", "6.86% (200 orders)"),
                KpiFigure::new("Total GMV", "$30,678.77"),
                KpiFigure::new("Average Order Value (AOV)", "$153.39"),
                KpiFigure::new("Expected Margin", "28%"),
                KpiFigure::new(
                    "Funnel",
                    "2,915 Attempts -> 1,342 Connects -> 1,063 Qualified -> 200 Orders",
                ),
            ],
        };
        let twelve_week = KpiSection {
            title: "PHASE 3: POWER BI (12-Week Trend)".to_string(),
            figures: vec![
                KpiFigure::new("Total Calls", "9,056"),
                KpiFigure::new("Total Orders", "420"),
                KpiFigure::new("Total GMV", "$61.73K"),
                KpiFigure::new("Connect Rate", "45.54%"),
                KpiFigure::new("Lead Conversion Rate", "27.10%"),
                KpiFigure::new("Average Order Value (AOV)", "$146.98"),
                KpiFigure::new("Avg Margin", "27.66%"),
            ],
        };

        Self {
            sections: vec![four_week, twelve_week],
            insights: vec![
                "Attempt Strategy: Connection and conversion rates plummet after Attempt 3. High effort, low reward.".to_string(),
                "Revenue Concentration: GMV is highly dependent on fresh, top-tier campaigns.".to_string(),
                "Action Plan: Institute a 3-attempt dialer cap, align with marketing on top 5 campaigns, and implement peer coaching for agents under 3% conversion.".to_string(),
            ],
        }
    }
}

/// Composes the system instruction
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    config: ContextConfig,
}

impl ContextBuilder {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Compose the instruction text. Identical inputs give identical output.
    ///
    /// `tables` lists the loaded datasets and is empty when none are loaded.
    pub fn build(
        &self,
        kpis: &KpiSnapshot,
        aggregates: Option<&CallAggregates>,
        tables: &[TableShape],
    ) -> String {
        let mut lines = vec![PERSONA.to_string(), String::new()];

        for section in &kpis.sections {
            lines.push(section.title.clone());
            lines.extend(
                section
                    .figures
                    .iter()
                    .map(|f| format!("- {}: {}", f.label, f.value)),
            );
            lines.push(String::new());
        }

        if !kpis.insights.is_empty() {
            lines.push("KEY STRATEGIC INSIGHTS:".to_string());
            lines.extend(
                kpis.insights
                    .iter()
                    .enumerate()
                    .map(|(i, insight)| format!("{}. {}", i + 1, insight)),
            );
            lines.push(String::new());
        }

        if !tables.is_empty() {
            self.push_schemas(&mut lines, tables);
            lines.push(String::new());
        }

        match aggregates {
            Some(aggregates) => self.push_aggregates(&mut lines, aggregates),
            None if tables.is_empty() => lines.push(NO_DATASETS.to_string()),
            None => lines.push(NO_CALL_STATISTICS.to_string()),
        }
        lines.push(String::new());
        lines.push(ANSWER_STYLE.to_string());

        let context = lines.join("\n");
        log_trace!(
            context_chars = context.len(),
            with_aggregates = aggregates.is_some(),
            tables = tables.len(),
            "Context built"
        );
        context
    }

    fn push_schemas(&self, lines: &mut Vec<String>, tables: &[TableShape]) {
        let limit = self.config.max_rows_per_table;
        lines.push("DATASET SCHEMAS:".to_string());
        for table in tables {
            let mut columns = table
                .columns
                .iter()
                .take(limit)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            if table.columns.len() > limit {
                columns.push_str(&format!(" (+{} more)", table.columns.len() - limit));
            }
            let rows = if table.rows == 1 { "row" } else { "rows" };
            lines.push(format!(
                "- {}: {} {rows}; columns: {columns}",
                table.name, table.rows
            ));
        }
    }

    fn push_aggregates(&self, lines: &mut Vec<String>, aggregates: &CallAggregates) {
        lines.push(format!(
            "CALL STATISTICS (derived from {} call records):",
            aggregates.total_calls
        ));
        self.push_table(lines, "Calls per agent", "agents", &aggregates.by_agent);
        self.push_table(
            lines,
            "Calls per campaign",
            "campaigns",
            &aggregates.by_campaign,
        );
        match &aggregates.by_attempt {
            AttemptBreakdown::Available(rows) => {
                self.push_table(lines, "Calls per attempt number", "attempt numbers", rows)
            }
            AttemptBreakdown::NotAvailable => {
                lines.push("Calls per attempt number:".to_string());
                lines.push(ATTEMPT_NOT_AVAILABLE.to_string());
            }
        }
    }

    fn push_table(&self, lines: &mut Vec<String>, title: &str, noun: &str, rows: &[AggregateRow]) {
        let limit = self.config.max_rows_per_table;
        if rows.len() > limit {
            lines.push(format!("{title} (top {limit} of {} {noun}):", rows.len()));
        } else {
            lines.push(format!("{title}:"));
        }

        lines.extend(
            rows.iter()
                .take(limit)
                .map(|row| format!("- {}: {}", display_key(&row.key), calls_label(row.count))),
        );

        if rows.len() > limit {
            lines.push(format!("({} more {noun} omitted)", rows.len() - limit));
        }
    }
}

fn display_key(key: &str) -> &str {
    if key.is_empty() {
        "(blank)"
    } else {
        key
    }
}

fn calls_label(count: u64) -> String {
    if count == 1 {
        "1 call".to_string()
    } else {
        format!("{count} calls")
    }
}
