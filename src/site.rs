//! The collaborators every file operation needs, bundled once.
//!
//! A [`Site`] holds the storage, the validated config, the namer chosen by
//! the config, the image backend and the post-processors. It is cheap to
//! clone (everything is behind `Arc`) and is handed to every
//! [`FileObject`](crate::file_object::FileObject).

use crate::config::Config;
use crate::imaging::{ImageBackend, RustBackend, SharedProcessor, build_processors};
use crate::namers::VersionNamer;
use crate::storage::{FileSystemStorage, Storage};
use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
pub struct Site {
    pub storage: Arc<dyn Storage>,
    pub config: Arc<Config>,
    pub namer: Arc<dyn VersionNamer>,
    pub backend: Arc<dyn ImageBackend>,
    pub processors: Arc<[SharedProcessor]>,
}

impl Site {
    /// Site over `storage` with the namer and processors `config` selects and
    /// the pure Rust backend.
    pub fn new(storage: Arc<dyn Storage>, config: Config) -> Self {
        let namer = config.namer.build();
        let processors = build_processors(&config.processors).into();
        Self {
            storage,
            config: Arc::new(config),
            namer,
            backend: Arc::new(RustBackend::new()),
            processors,
        }
    }

    /// Site over a [`FileSystemStorage`] rooted at `config.location`.
    ///
    /// A relative location is resolved against `base_dir`.
    pub fn from_config(config: Config, base_dir: &Path) -> Self {
        let location = base_dir.join(&config.location);
        let storage = Arc::new(FileSystemStorage::new(location, &config.base_url));
        Self::new(storage, config)
    }

    pub fn with_backend(mut self, backend: Arc<dyn ImageBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_namer(mut self, namer: Arc<dyn VersionNamer>) -> Self {
        self.namer = namer;
        self
    }

    /// Append a processor after the configured ones.
    pub fn with_processor(mut self, processor: SharedProcessor) -> Self {
        let mut all = self.processors.to_vec();
        all.push(processor);
        self.processors = all.into();
        self
    }

    /// Root of the versions tree, if one is configured and exists on storage.
    pub fn versions_root(&self) -> Option<String> {
        let dir = self.config.versions_directory();
        (!dir.is_empty() && self.storage.exists(&dir)).then_some(dir)
    }
}

impl std::fmt::Debug for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site")
            .field("location", &self.config.location)
            .field("namer", &self.config.namer)
            .field("processors", &self.processors.len())
            .finish()
    }
}
