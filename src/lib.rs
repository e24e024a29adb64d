//! Pre-processing dispatcher for batches of observed mutation records.
//!
//! A [`MutationBatchDispatcher`] sits between whatever observes a structure for changes and the
//! handler that acts on those changes. Every batch is first offered to an optional
//! [`Preprocessor`], which may skip it, let it pass through untouched, or replace it with a
//! different set of records. See [`PreprocessResult`] for the exact contract.

/// Runs the body only when the `tracing` feature is enabled.
#[macro_export]
macro_rules! if_tracing {
    {$($body:tt)*} => {
        ::cfg_if::cfg_if! {
            if #[cfg(feature = "tracing")] {
                $($body)*
            }
        }
    };
}

pub mod dispatcher;
pub mod pipeline;
pub mod preprocess;
pub mod record;
pub mod rules;

#[cfg(test)]
mod tests;

pub use dispatcher::{BatchHandler, DispatchOutcome, MutationBatchDispatcher};
pub use pipeline::PreprocessPipeline;
pub use preprocess::{PreprocessResult, Preprocessor};
pub use record::{MutationBatch, MutationKind, MutationRecord, NodeRef, RecordError};
pub use rules::{RuleSet, RulesError};
