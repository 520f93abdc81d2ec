//! Explicit module registry.
//!
//! The composition root registers factories by name and instantiates
//! modules from them with explicit dependencies. There is no load-time
//! global registration, so construction order is always visible in `main`.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::backend::ProcessingBackend;
use crate::containers::RemoteFsPath;
use crate::module::{ArtifactProcessor, ModuleError, ProcessorOptions, ThreadAwareModule};
use crate::reporting::MessageSink;
use crate::state::PipelineState;

pub type BoxedModule = Arc<dyn ThreadAwareModule<Item = RemoteFsPath>>;

/// Dependencies handed to a module factory.
pub struct ModuleDeps {
    pub backend: Arc<dyn ProcessingBackend>,
    pub state: Arc<PipelineState>,
    pub messages: Arc<dyn MessageSink>,
    pub options: ProcessorOptions,
}

pub type ModuleFactory = fn(ModuleDeps) -> Result<BoxedModule, ModuleError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("module {0} is already registered")]
    Duplicate(String),
    #[error("unknown module: {0}")]
    Unknown(String),
    #[error(transparent)]
    Module(#[from] ModuleError),
}

#[derive(Default)]
pub struct ModuleRegistry {
    factories: HashMap<String, ModuleFactory>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, factory: ModuleFactory) -> Result<(), RegistryError> {
        if self.factories.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.factories.insert(name.to_string(), factory);
        Ok(())
    }

    /// Instantiate and configure the named module.
    pub fn create(&self, name: &str, deps: ModuleDeps) -> Result<BoxedModule, RegistryError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RegistryError::Unknown(name.to_string()))?;
        Ok(factory(deps)?)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Factory for [`ArtifactProcessor`]; configuration happens here so the
/// registry only ever hands out ready modules.
pub fn artifact_processor_factory(deps: ModuleDeps) -> Result<BoxedModule, ModuleError> {
    let module = ArtifactProcessor::new(deps.backend, deps.state, deps.messages);
    module.configure(deps.options)?;
    Ok(Arc::new(module))
}
