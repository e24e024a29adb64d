pub use anyhow::Result;

use crate::record::MutationRecord;

/// What a [`Preprocessor`] decided to do with a batch.
///
/// The three outcomes are disjoint. In particular an empty [`Replace`](PreprocessResult::Replace)
/// still reaches the downstream handler (with zero records), while [`Skip`](PreprocessResult::Skip)
/// never does.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub enum PreprocessResult {
    /// Drop the batch. The downstream handler is not called.
    Skip,

    /// Forward the original batch unmodified.
    #[default]
    PassThrough,

    /// Forward these records instead of the original batch.
    ///
    /// May be a subset, a superset, or an element-wise rewrite of the original, and may be empty.
    Replace(Vec<MutationRecord>),
}

impl PreprocessResult {
    pub const fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }

    pub const fn is_pass_through(&self) -> bool {
        matches!(self, Self::PassThrough)
    }

    pub fn as_replacement(&self) -> Option<&[MutationRecord]> {
        match self {
            Self::Replace(records) => Some(records.as_slice()),
            _ => None,
        }
    }
}

/// Callbacks written before replacement existed only ever returned `false` or nothing.
///
/// `false` skips, anything else passes through.
impl From<bool> for PreprocessResult {
    fn from(value: bool) -> Self {
        if value { Self::PassThrough } else { Self::Skip }
    }
}

impl From<()> for PreprocessResult {
    fn from((): ()) -> Self {
        Self::PassThrough
    }
}

impl From<Vec<MutationRecord>> for PreprocessResult {
    fn from(records: Vec<MutationRecord>) -> Self {
        Self::Replace(records)
    }
}

/// `None` passes through, `Some` replaces (even when empty).
impl From<Option<Vec<MutationRecord>>> for PreprocessResult {
    fn from(records: Option<Vec<MutationRecord>>) -> Self {
        match records {
            Some(records) => Self::Replace(records),
            None => Self::PassThrough,
        }
    }
}

/// A host-supplied step that runs once per batch before the downstream handler.
///
/// Implementations are synchronous and must not hold on to `records` after returning.
pub trait Preprocessor {
    /// Decides whether the batch is skipped, passed through, or replaced.
    ///
    /// # Errors
    ///
    /// Any error is handed back to the caller of the dispatch unchanged, and the downstream
    /// handler is not called for that batch.
    fn preprocess(&mut self, records: &[MutationRecord]) -> Result<PreprocessResult>;

    /// Returns the name of the preprocessor.
    /// Use for debugging purposes.
    ///
    /// Defaults to the type name of the preprocessor.
    fn debug_name(&self) -> String {
        core::any::type_name::<Self>().to_string()
    }

    /// Converts the preprocessor into a boxed trait object.
    /// Useful for storing different preprocessors in a single collection.
    fn into_boxed<'a>(self) -> Box<dyn Preprocessor + 'a>
    where
        Self: Sized + 'a,
    {
        Box::new(self)
    }
}

impl<F> Preprocessor for F
where
    F: FnMut(&[MutationRecord]) -> Result<PreprocessResult>,
{
    fn preprocess(&mut self, records: &[MutationRecord]) -> Result<PreprocessResult> {
        self(records)
    }
}
