use std::collections::BTreeMap;
use std::sync::Arc;

use super::{Stage, StageEvent, StageObserver, StageStatus};
use crate::dataset::DatasetError;

/// Behaviour run around a stage body.
///
/// Implementations must call `body` exactly once and return its error
/// unchanged.
pub trait StageWrapper: Send + Sync {
    fn run(
        &self,
        stage: Stage,
        observer: &dyn StageObserver,
        body: &mut dyn FnMut() -> Result<(), DatasetError>,
    ) -> Result<(), DatasetError>;
}

/// Announces start, completion, and failure of the wrapped stage.
#[derive(Debug, Clone)]
pub struct Announce {
    message: String,
}

impl Announce {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn emit(
        &self,
        observer: &dyn StageObserver,
        stage: Stage,
        status: StageStatus,
        error: Option<String>,
    ) {
        observer.on_event(&StageEvent {
            stage,
            status,
            message: self.message.clone(),
            error,
        });
    }
}

impl StageWrapper for Announce {
    fn run(
        &self,
        stage: Stage,
        observer: &dyn StageObserver,
        body: &mut dyn FnMut() -> Result<(), DatasetError>,
    ) -> Result<(), DatasetError> {
        self.emit(observer, stage, StageStatus::Started, None);
        match body() {
            Ok(()) => {
                self.emit(observer, stage, StageStatus::Completed, None);
                Ok(())
            }
            Err(err) => {
                self.emit(observer, stage, StageStatus::Failed, Some(err.to_string()));
                Err(err)
            }
        }
    }
}

/// Runs the body with no extra behaviour; registering it opts a stage out.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl StageWrapper for Passthrough {
    fn run(
        &self,
        _stage: Stage,
        _observer: &dyn StageObserver,
        body: &mut dyn FnMut() -> Result<(), DatasetError>,
    ) -> Result<(), DatasetError> {
        body()
    }
}

/// Stage → wrapper table consulted every time the pipeline runs a stage.
///
/// The pipeline starts from [`StageRegistry::announced`] and lets the plugin
/// adjust it, so a plugin that replaces a stage body still runs inside the
/// wrapper registered for that stage. Registering again for the same stage
/// replaces the previous wrapper; the last registration wins.
#[derive(Clone, Default)]
pub struct StageRegistry {
    wrappers: BTreeMap<Stage, Arc<dyn StageWrapper>>,
}

impl StageRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Default table: the non-interactive stages that touch disk announce
    /// themselves. Discover, filter, and construct run bare.
    pub fn announced() -> Self {
        let mut registry = Self::empty();
        registry.register(Stage::Materialize, Announce::new("Copying data into temp folder..."));
        registry.register(Stage::Write, Announce::new("Writing out dataset locally..."));
        registry.register(Stage::Metadata, Announce::new("Writing out metadata locally..."));
        registry.register(Stage::Extras, Announce::new("Writing out additional files..."));
        registry
    }

    /// Bind `wrapper` to `stage`, returning the wrapper it replaced.
    pub fn register(
        &mut self,
        stage: Stage,
        wrapper: impl StageWrapper + 'static,
    ) -> Option<Arc<dyn StageWrapper>> {
        self.wrappers.insert(stage, Arc::new(wrapper))
    }

    /// Run `stage` without any wrapper behaviour.
    pub fn opt_out(&mut self, stage: Stage) -> Option<Arc<dyn StageWrapper>> {
        self.register(stage, Passthrough)
    }

    pub fn is_wrapped(&self, stage: Stage) -> bool {
        self.wrappers.contains_key(&stage)
    }

    /// Run `body` for `stage` through the registered wrapper, if any.
    pub fn dispatch<T>(
        &self,
        stage: Stage,
        observer: &dyn StageObserver,
        body: impl FnOnce() -> Result<T, DatasetError>,
    ) -> Result<T, DatasetError> {
        let Some(wrapper) = self.wrappers.get(&stage) else {
            return body();
        };
        let mut body = Some(body);
        let mut output = None;
        wrapper.run(stage, observer, &mut || {
            let body = body.take().ok_or(DatasetError::WrapperMisuse {
                stage,
                reason: "ran its body more than once",
            })?;
            output = Some(body()?);
            Ok(())
        })?;
        output.ok_or(DatasetError::WrapperMisuse {
            stage,
            reason: "returned without running its body",
        })
    }
}

impl std::fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.wrappers.keys()).finish()
    }
}
