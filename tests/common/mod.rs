//! Shared fixtures for correlation integration tests
//!
//! Builds throwaway data trees laid out as `<root>/targets/<target>/<tool>/...`
//! and provides store doubles for fault injection.

#![allow(dead_code)]

pub mod faulty_store;
pub mod fixtures;

pub use faulty_store::FaultyStore;

use dossier::{CorrelationDriver, CorrelationStore, CorrelatorConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A temporary data root holding one or more targets
pub struct DataTree {
    dir: TempDir,
}

impl DataTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp data root"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn target_dir(&self, target: &str) -> PathBuf {
        self.root().join("targets").join(target)
    }

    /// Write `contents` at `targets/<target>/<relative>`, creating directories
    pub fn file(&self, target: &str, relative: &str, contents: impl AsRef<[u8]>) -> &Self {
        let path = self.target_dir(target).join(relative);
        std::fs::create_dir_all(path.parent().expect("file has a parent")).expect("create tool dir");
        std::fs::write(path, contents).expect("write fixture file");
        self
    }

    pub fn config(&self) -> CorrelatorConfig {
        CorrelatorConfig {
            data_dir: self.root().to_path_buf(),
            db_path: self.root().join("dossier.db"),
            ..Default::default()
        }
    }

    pub fn driver(&self, store: Arc<dyn CorrelationStore>) -> CorrelationDriver {
        CorrelationDriver::new(store, &self.config())
    }

    pub fn driver_with(&self, store: Arc<dyn CorrelationStore>, config: CorrelatorConfig) -> CorrelationDriver {
        CorrelationDriver::new(store, &config)
    }
}
