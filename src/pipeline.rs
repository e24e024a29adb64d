use core::fmt;

use crate::{
    preprocess::{PreprocessResult, Preprocessor, Result},
    record::MutationRecord,
};

/// Several preprocessors run one after another as a single [`Preprocessor`].
///
/// Each stage sees the record set produced so far: the original batch until some stage
/// replaces it. A skip from any stage skips the whole batch and later stages do not run.
/// The pipeline passes through when no stage replaced anything.
pub struct PreprocessPipeline<'a> {
    stages: Vec<Box<dyn Preprocessor + 'a>>,
}

impl<'a> PreprocessPipeline<'a> {
    pub const fn new() -> Self {
        Self { stages: vec![] }
    }

    pub fn push_stage(&mut self, stage: impl Preprocessor + 'a) {
        self.stages.push(stage.into_boxed());
    }

    /// Chain this method to add multiple stages in a shorter way.
    pub fn with_stage(mut self, stage: impl Preprocessor + 'a) -> Self {
        self.push_stage(stage);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Default for PreprocessPipeline<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor for PreprocessPipeline<'_> {
    fn preprocess(&mut self, records: &[MutationRecord]) -> Result<PreprocessResult> {
        if_tracing! {
            let pipeline_span = tracing::span!(tracing::Level::DEBUG, "preprocess_pipeline", stages = self.stages.len());
            let _enter = pipeline_span.enter();
        }

        // `None` until a stage hands back its own records
        let mut current: Option<Vec<MutationRecord>> = None;

        for stage in self.stages.iter_mut() {
            let input = current.as_deref().unwrap_or(records);
            let result = stage.preprocess(input)?;

            if_tracing! {
                tracing::trace!(stage = %stage.debug_name(), result = ?result, "stage complete");
            }

            match result {
                PreprocessResult::Skip => {
                    if_tracing! {
                        tracing::debug!(event = "pipeline_skip", stage = %stage.debug_name(), "stage skipped the batch");
                    }
                    return Ok(PreprocessResult::Skip);
                }
                PreprocessResult::PassThrough => {}
                PreprocessResult::Replace(replacement) => current = Some(replacement),
            }
        }

        Ok(current.into())
    }

    fn debug_name(&self) -> String {
        let names = self.stages.iter().map(|s| s.debug_name()).collect::<Vec<_>>();
        format!("pipeline[{}]", names.join(" -> "))
    }
}

impl fmt::Debug for PreprocessPipeline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreprocessPipeline").field("stages", &self.debug_name()).finish()
    }
}
