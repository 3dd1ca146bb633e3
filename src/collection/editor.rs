use super::inspect::CollectionInfo;
use super::model::Collection;
use crate::common::error::{CollectionError, Result};
use crate::document::{self, Decoded, TextEncoding};
use crate::logging;
use std::fs;
use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};

/// One editing session over one collection document.
///
/// The session owns the document; mutations go through `collection_mut`
/// and reach the disk only on `save`.
#[derive(Debug)]
pub struct CollectionEditor {
    collection: Collection,
    path: Option<PathBuf>,
    encoding: Option<TextEncoding>,
    /// Bytes as read from disk, kept for the backup
    original: Vec<u8>,
    backup: Option<PathBuf>,
}

impl CollectionEditor {
    pub fn load(path: &Path) -> Result<Self> {
        let (decoded, bytes) = document::read_document(path)?;
        Ok(Self::loaded(path, decoded, bytes))
    }

    pub async fn load_async(path: &Path) -> Result<Self> {
        let (decoded, bytes) = document::read_document_async(path).await?;
        Ok(Self::loaded(path, decoded, bytes))
    }

    fn loaded(path: &Path, decoded: Decoded<Collection>, bytes: Vec<u8>) -> Self {
        log::info!(
            "Loaded collection {:?} ({} requests, {})",
            path,
            decoded.value.request_count(),
            decoded.encoding.label()
        );
        Self {
            collection: decoded.value,
            path: Some(path.to_path_buf()),
            encoding: Some(decoded.encoding),
            original: bytes,
            backup: None,
        }
    }

    /// Session over an in-memory document, e.g. a fresh conversion
    pub fn from_collection(collection: Collection) -> Self {
        Self {
            collection,
            path: None,
            encoding: None,
            original: Vec::new(),
            backup: None,
        }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn collection_mut(&mut self) -> &mut Collection {
        &mut self.collection
    }

    pub fn into_collection(self) -> Collection {
        self.collection
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn encoding(&self) -> Option<TextEncoding> {
        self.encoding
    }

    pub fn backup_path(&self) -> Option<&Path> {
        self.backup.as_deref()
    }

    /// Resolve the save target and adopt it when the session has no path yet
    fn target(&mut self, path: Option<&Path>) -> Result<PathBuf> {
        let target = match (path, &self.path) {
            (Some(given), _) => given.to_path_buf(),
            (None, Some(own)) => own.clone(),
            (None, None) => {
                return Err(CollectionError::Io(Error::new(
                    ErrorKind::InvalidInput,
                    "no target path for an unsaved collection",
                )))
            }
        };
        if self.path.is_none() {
            self.path = Some(target.clone());
        }
        Ok(target)
    }

    /// Write the document as pretty JSON to `path`, or back to where it was
    /// loaded from.
    pub fn save(&mut self, path: Option<&Path>) -> Result<PathBuf> {
        let target = self.target(path)?;
        document::write_document(&target, &self.collection)?;
        self.saved(&target);
        Ok(target)
    }

    pub async fn save_async(&mut self, path: Option<&Path>) -> Result<PathBuf> {
        let target = self.target(path)?;
        document::write_document_async(&target, &self.collection).await?;
        self.saved(&target);
        Ok(target)
    }

    fn saved(&self, target: &Path) {
        log::info!("Saved collection to {:?}", target);
        let _ = logging::write_domain_log(
            "audit",
            &format!("Saved collection to {}", target.display()),
        );
    }

    /// Copy the bytes the session was loaded from to a timestamped sibling
    /// file. Only the first call writes; later calls return the same path.
    pub fn backup(&mut self) -> Result<PathBuf> {
        if let Some(existing) = &self.backup {
            return Ok(existing.clone());
        }
        let Some(path) = self.path.as_deref().filter(|_| !self.original.is_empty()) else {
            return Err(CollectionError::Io(Error::new(
                ErrorKind::InvalidInput,
                "collection was not loaded from a file",
            )));
        };

        let target = document::write_backup(path, &self.original)?;
        let _ = logging::write_domain_log(
            "audit",
            &format!("Backed up {} to {}", path.display(), target.display()),
        );
        self.backup = Some(target.clone());
        Ok(target)
    }

    /// Document summary plus the size of the session's file, when it has one
    pub fn collection_info(&self) -> CollectionInfo {
        let mut info = self.collection.collection_info();
        info.file_size_bytes = self
            .path
            .as_deref()
            .and_then(|path| fs::metadata(path).ok())
            .map(|meta| meta.len());
        info
    }
}
