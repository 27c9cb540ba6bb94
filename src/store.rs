//! Whole-document persistence for the ledger and the access list.
//!
//! Each store holds exactly one document. Callers load it, change it in memory
//! and save it back; there are no partial updates. Callers that share a store
//! between tasks wrap it in a mutex and hold the lock for the whole
//! load-change-save sequence.

use std::{
    fs,
    io::ErrorKind,
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use serde::{Serialize, de::DeserializeOwned};

use crate::Error;

/// Loads and saves a single document of type `T`.
pub trait DocumentStore<T>: Send {
    /// Read the whole document.
    ///
    /// # Errors
    ///
    /// Returns an [Error::StorageCorrupt] if the stored document cannot be
    /// read as a `T`, or an [Error::StorageIo] if the storage cannot be read.
    fn load(&self) -> Result<T, Error>;

    /// Replace the whole document with `document`.
    ///
    /// # Errors
    ///
    /// Returns an [Error::StorageIo] if the document could not be written.
    fn save(&self, document: &T) -> Result<(), Error>;
}

impl<T, S> DocumentStore<T> for Arc<S>
where
    S: DocumentStore<T> + Sync + ?Sized,
{
    fn load(&self) -> Result<T, Error> {
        (**self).load()
    }

    fn save(&self, document: &T) -> Result<(), Error> {
        (**self).save(document)
    }
}

/// A document stored as a pretty-printed JSON file.
///
/// A missing file reads as the empty (default) document.
#[derive(Debug, Clone)]
pub struct JsonFileStore<T> {
    path: PathBuf,
    document: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T> {
    /// Create a store backed by the file at `path`. The file is not touched
    /// until the first load or save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: PhantomData,
        }
    }

    /// The path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T> DocumentStore<T> for JsonFileStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    fn load(&self) -> Result<T, Error> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                tracing::debug!("{} does not exist, using an empty document", self.path.display());
                return Ok(T::default());
            }
            Err(error) => {
                return Err(Error::StorageIo(format!(
                    "could not read {}: {error}",
                    self.path.display()
                )));
            }
        };

        serde_json::from_str(&text).map_err(|error| Error::StorageCorrupt {
            path: self.path.display().to_string(),
            reason: error.to_string(),
        })
    }

    fn save(&self, document: &T) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(document)
            .map_err(|error| Error::JSONSerializationError(error.to_string()))?;

        // Write next to the target and rename over it so readers never see a
        // half-written document.
        let mut temporary_path = self.path.clone().into_os_string();
        temporary_path.push(".tmp");

        fs::write(&temporary_path, json)
            .and_then(|_| fs::rename(&temporary_path, &self.path))
            .map_err(|error| {
                Error::StorageIo(format!("could not write {}: {error}", self.path.display()))
            })
    }
}

/// A document held in memory, for tests and for running without files.
#[derive(Debug, Default)]
pub struct MemoryStore<T> {
    document: Mutex<T>,
}

impl<T> MemoryStore<T> {
    /// Create a store holding `document`.
    pub fn new(document: T) -> Self {
        Self {
            document: Mutex::new(document),
        }
    }
}

impl<T: Clone + Send> DocumentStore<T> for MemoryStore<T> {
    fn load(&self) -> Result<T, Error> {
        self.document
            .lock()
            .map(|document| document.clone())
            .map_err(|_| Error::LockPoisoned)
    }

    fn save(&self, document: &T) -> Result<(), Error> {
        let mut stored = self.document.lock().map_err(|_| Error::LockPoisoned)?;
        *stored = document.clone();

        Ok(())
    }
}
