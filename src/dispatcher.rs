use core::fmt;

use anyhow::Result;

use crate::{
    preprocess::{PreprocessResult, Preprocessor},
    record::MutationRecord,
};

/// The downstream consumer that acts on the final record set of a batch.
pub trait BatchHandler {
    /// # Errors
    ///
    /// Errors are handed back to the caller of the dispatch unchanged.
    fn handle_batch(&mut self, records: &[MutationRecord]) -> Result<()>;
}

impl<F> BatchHandler for F
where
    F: FnMut(&[MutationRecord]) -> Result<()>,
{
    fn handle_batch(&mut self, records: &[MutationRecord]) -> Result<()> {
        self(records)
    }
}

/// Which branch a single dispatch took.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum DispatchOutcome {
    /// The batch was dropped and the handler was not called.
    Skipped,
    /// The handler received the original batch.
    PassedThrough,
    /// The handler received a replacement of `forwarded` records.
    Replaced { forwarded: usize },
}

impl DispatchOutcome {
    /// Whether the downstream handler was called.
    pub const fn forwarded(&self) -> bool {
        !matches!(self, Self::Skipped)
    }
}

/// Hands batches of mutation records to a downstream handler, giving an optional
/// [`Preprocessor`] the chance to skip, pass through, or replace each one first.
///
/// The dispatcher keeps no state between calls. Every [`dispatch`](Self::dispatch) is an
/// independent, synchronous pass: the preprocessor runs exactly once, then the handler runs at
/// most once.
pub struct MutationBatchDispatcher<'a> {
    on_batch: Box<dyn BatchHandler + 'a>,
    preprocess: Option<Box<dyn Preprocessor + 'a>>,
}

impl<'a> MutationBatchDispatcher<'a> {
    /// A dispatcher without a preprocessor forwards every batch unchanged.
    pub fn new(on_batch: impl BatchHandler + 'a) -> Self {
        MutationBatchDispatcher {
            on_batch: Box::new(on_batch),
            preprocess: None,
        }
    }

    pub fn with_preprocessor(on_batch: impl BatchHandler + 'a, preprocess: impl Preprocessor + 'a) -> Self {
        MutationBatchDispatcher {
            on_batch: Box::new(on_batch),
            preprocess: Some(preprocess.into_boxed()),
        }
    }

    pub fn has_preprocessor(&self) -> bool {
        self.preprocess.is_some()
    }

    /// Runs one batch through the preprocessor and on to the handler.
    ///
    /// # Errors
    ///
    /// An error from the preprocessor is returned as is, and the handler is not called.
    /// An error from the handler is returned as is. Neither leaves the dispatcher unusable.
    pub fn dispatch(&mut self, batch: &[MutationRecord]) -> Result<DispatchOutcome> {
        if_tracing! {
            let span = tracing::span!(tracing::Level::DEBUG, "dispatch", records = batch.len());
            let _enter = span.enter();
        }

        let Some(preprocess) = self.preprocess.as_mut() else {
            self.on_batch.handle_batch(batch)?;
            return Ok(DispatchOutcome::PassedThrough);
        };

        let outcome = match preprocess.preprocess(batch)? {
            PreprocessResult::Skip => DispatchOutcome::Skipped,
            PreprocessResult::PassThrough => {
                self.on_batch.handle_batch(batch)?;
                DispatchOutcome::PassedThrough
            }
            PreprocessResult::Replace(records) => {
                self.on_batch.handle_batch(&records)?;
                DispatchOutcome::Replaced { forwarded: records.len() }
            }
        };

        if_tracing! {
            tracing::debug!(event = "dispatched", records = batch.len(), outcome = ?outcome, "batch dispatched");
        }

        Ok(outcome)
    }
}

impl fmt::Debug for MutationBatchDispatcher<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationBatchDispatcher")
            .field("preprocess", &self.preprocess.as_ref().map(|p| p.debug_name()))
            .finish_non_exhaustive()
    }
}
