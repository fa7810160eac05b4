//! Dataset loading and call statistics
//!
//! - `schema` - configurable column names of the call table
//! - `loader` - all-or-nothing CSV loading with a process-wide cache
//! - `aggregate` - ranked group-and-count aggregates

pub mod aggregate;
pub mod loader;
pub mod schema;

pub use aggregate::{
    aggregate_calls, count_by, AggregateRow, AttemptBreakdown, CallAggregates,
    ATTEMPT_NOT_AVAILABLE,
};
pub use loader::{shared_datasets, DatasetLoader, DatasetState, Datasets, Table, TableShape};
pub use schema::CallSchema;
