//! The chat turn: session, context and gateway wired together.

use crate::config::AppConfig;
use crate::context::{ContextBuilder, KpiSnapshot};
use crate::core_types::Message;
use crate::data::{aggregate_calls, CallAggregates, CallSchema, DatasetState, TableShape};
use crate::error::InsightsResult;
use crate::gateway::ModelGateway;
use crate::logging::{log_debug, log_warn};
use crate::session::{ConversationSession, INTERRUPTED_REPLY};

/// Exactly what one turn sends to the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedRequest {
    pub system_instruction: String,
    pub transcript: String,
}

/// Answers questions for any number of sessions.
///
/// Holds only read-only state; each caller passes its own session.
#[derive(Debug)]
pub struct Assistant {
    gateway: ModelGateway,
    context_builder: ContextBuilder,
    kpis: KpiSnapshot,
    aggregates: Option<CallAggregates>,
    tables: Vec<TableShape>,
}

impl Assistant {
    pub fn new(
        gateway: ModelGateway,
        context_builder: ContextBuilder,
        kpis: KpiSnapshot,
        aggregates: Option<CallAggregates>,
    ) -> Self {
        Self {
            gateway,
            context_builder,
            kpis,
            aggregates,
            tables: Vec::new(),
        }
    }

    /// Describe the loaded tables in every request
    pub fn with_tables(mut self, tables: Vec<TableShape>) -> Self {
        self.tables = tables;
        self
    }

    /// Build an assistant over whatever the loader produced. Missing data
    /// or missing required columns leave the context with headline figures
    /// only.
    pub fn from_datasets(gateway: ModelGateway, config: &AppConfig, datasets: &DatasetState) -> Self {
        let aggregates = aggregates_for(datasets, &config.datasets.call_schema);
        let tables = datasets
            .datasets()
            .map(|loaded| loaded.shapes())
            .unwrap_or_default();
        Self::new(
            gateway,
            ContextBuilder::new(config.context.clone()),
            KpiSnapshot::default(),
            aggregates,
        )
        .with_tables(tables)
    }

    pub fn aggregates(&self) -> Option<&CallAggregates> {
        self.aggregates.as_ref()
    }

    pub fn tables(&self) -> &[TableShape] {
        &self.tables
    }

    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    /// Instruction and transcript as they would be sent for `session` now
    pub fn compose_request(&self, session: &ConversationSession) -> ComposedRequest {
        ComposedRequest {
            system_instruction: self.context_builder.build(
                &self.kpis,
                self.aggregates.as_ref(),
                &self.tables,
            ),
            transcript: session.render_transcript(),
        }
    }

    /// Run one turn and return the appended assistant message.
    ///
    /// Gateway failures become the reply text; they are never returned.
    /// If the returned future is dropped before the reply arrives, the turn
    /// is closed with [`INTERRUPTED_REPLY`] so the session takes new input.
    ///
    /// # Errors
    ///
    /// Only session misuse: an empty prompt, or a turn already in progress.
    pub async fn ask<'s>(
        &self,
        session: &'s mut ConversationSession,
        prompt: &str,
    ) -> InsightsResult<&'s Message> {
        session.submit_user(prompt)?;

        let result = {
            let mut pending = PendingTurn {
                session: &mut *session,
                completed: false,
            };
            let request = self.compose_request(&*pending.session);
            let result = self
                .gateway
                .respond(&request.system_instruction, &request.transcript)
                .await;
            pending.completed = true;
            result
        };

        if let Err(e) = &result {
            log_debug!(
                error = %e,
                category = ?e.category(),
                "Turn answered with error text"
            );
        }

        session.record_reply(ModelGateway::reply_text(&result))
    }
}

/// Closes the pending turn unless the reply was received
struct PendingTurn<'a> {
    session: &'a mut ConversationSession,
    completed: bool,
}

impl Drop for PendingTurn<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.session.abandon_pending(INTERRUPTED_REPLY);
        }
    }
}

/// Aggregates from the calls table, or `None` when there is nothing usable
pub fn aggregates_for(datasets: &DatasetState, schema: &CallSchema) -> Option<CallAggregates> {
    let datasets = datasets.datasets()?;
    match aggregate_calls(&datasets.calls, schema) {
        Ok(aggregates) => Some(aggregates),
        Err(e) => {
            log_warn!(error = %e, "Call aggregates unavailable");
            None
        }
    }
}
