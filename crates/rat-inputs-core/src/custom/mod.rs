//! Custom model handles.
//!
//! Models written in Rust are resolved here into invocable handles through a
//! [`ModelLoader`]. Files in any other language keep only their path and
//! language; the engine loads them itself at calculation time.

use crate::domain::Language;
use crate::project::CustomFile;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFileRecord {
    pub name: String,
    pub filename: String,
    pub function_name: String,
    pub language: Language,
    pub path: PathBuf,
}

impl CustomFileRecord {
    pub fn full_path(&self) -> PathBuf {
        self.path.join(&self.filename)
    }
}

impl From<&CustomFile> for CustomFileRecord {
    fn from(file: &CustomFile) -> Self {
        Self {
            name: file.name.clone(),
            filename: file.filename.clone(),
            function_name: file.function_name.clone(),
            language: file.language,
            path: file.path.clone(),
        }
    }
}

/// Arguments the engine passes to a custom model for one contrast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CustomModelArgs<'a> {
    pub params: &'a [f64],
    pub bulk_in: &'a [f64],
    pub bulk_out: &'a [f64],
    /// 1-based contrast index.
    pub contrast: usize,
    /// 1-based domain index, domains calculations only.
    pub domain: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomModelOutput {
    /// Layer rows for custom layers, (z, SLD) rows for custom XY.
    pub rows: Vec<Vec<f64>>,
    pub substrate_roughness: f64,
}

pub type CustomModelFn = dyn Fn(&CustomModelArgs<'_>) -> CustomModelOutput + Send + Sync;

#[derive(Clone)]
pub struct CustomModelHandle {
    function_name: String,
    function: Arc<CustomModelFn>,
}

impl CustomModelHandle {
    pub fn new<F>(function_name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&CustomModelArgs<'_>) -> CustomModelOutput + Send + Sync + 'static,
    {
        Self {
            function_name: function_name.into(),
            function: Arc::new(function),
        }
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn invoke(&self, args: &CustomModelArgs<'_>) -> CustomModelOutput {
        (self.function)(args)
    }
}

impl Debug for CustomModelHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomModelHandle")
            .field("function_name", &self.function_name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("custom model file '{}' could not be loaded", path.display())]
    FileNotLoaded { path: PathBuf },
    #[error("custom model file '{}' has no function \"{function}\"", path.display())]
    EntryPointMissing { path: PathBuf, function: String },
}

/// Source of Rust model handles, keyed by the model file path and the
/// function name inside it.
pub trait ModelLoader {
    fn load(&self, path: &Path, function_name: &str) -> Result<CustomModelHandle, ResolveError>;
}

/// In-process loader: model files are registered up front with the
/// functions they export.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    modules: HashMap<PathBuf, HashMap<String, CustomModelHandle>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(
        &mut self,
        path: impl Into<PathBuf>,
        function_name: impl Into<String>,
        function: F,
    ) -> &mut Self
    where
        F: Fn(&CustomModelArgs<'_>) -> CustomModelOutput + Send + Sync + 'static,
    {
        let function_name = function_name.into();
        let handle = CustomModelHandle::new(function_name.clone(), function);
        self.modules
            .entry(path.into())
            .or_default()
            .insert(function_name, handle);
        self
    }
}

impl ModelLoader for ModelRegistry {
    fn load(&self, path: &Path, function_name: &str) -> Result<CustomModelHandle, ResolveError> {
        let module = self
            .modules
            .get(path)
            .ok_or_else(|| ResolveError::FileNotLoaded {
                path: path.to_path_buf(),
            })?;
        module
            .get(function_name)
            .cloned()
            .ok_or_else(|| ResolveError::EntryPointMissing {
                path: path.to_path_buf(),
                function: function_name.to_string(),
            })
    }
}

#[derive(Debug, Clone)]
pub enum ResolvedHandle {
    Native(CustomModelHandle),
    External { path: PathBuf, language: Language },
}

impl ResolvedHandle {
    pub fn as_native(&self) -> Option<&CustomModelHandle> {
        match self {
            Self::Native(handle) => Some(handle),
            Self::External { .. } => None,
        }
    }
}

/// Resolved handles, one per entry of the problem's `customFiles`.
#[derive(Debug, Clone, Default)]
pub struct FileHandles {
    entries: Vec<ResolvedHandle>,
}

impl FileHandles {
    pub fn resolve(
        records: &[CustomFileRecord],
        loader: &dyn ModelLoader,
    ) -> Result<Self, ResolveError> {
        let entries = records
            .iter()
            .map(|record| match record.language {
                Language::Rust => loader
                    .load(&record.full_path(), &record.function_name)
                    .map(ResolvedHandle::Native),
                language => Ok(ResolvedHandle::External {
                    path: record.full_path(),
                    language,
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            files = entries.len(),
            native = entries.iter().filter(|entry| entry.as_native().is_some()).count(),
            "resolved custom model handles"
        );
        Ok(Self { entries })
    }

    /// Entry for a 1-based `customFiles` index.
    pub fn get(&self, index: usize) -> Option<&ResolvedHandle> {
        index.checked_sub(1).and_then(|position| self.entries.get(position))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedHandle> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
