//! ZIP archive index backed by an in-memory copy of the archive.
//!
//! Every [`ZipContent`] shares the parsed central directory and the archive
//! bytes, so entries can be decompressed from several write tasks at once.

use std::fmt;
use std::io::{self, Cursor, Write};
use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use zip::ZipArchive;

use crate::content::{EntryContent, copy_cancellable};
use crate::entry::ArchiveEntry;
use crate::error::{Error, Result};

type SharedBytes = Cursor<Arc<[u8]>>;

#[derive(Clone)]
pub struct ZipIndex {
    archive: ZipArchive<SharedBytes>,
}

impl ZipIndex {
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(bytes.into())).map_err(|_| Error::Corrupted)?;
        Ok(Self { archive })
    }

    /// Read the whole archive at `path` into memory and index it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(bytes)
    }

    pub fn len(&self) -> usize { self.archive.len() }

    pub fn is_empty(&self) -> bool { self.archive.len() == 0 }

    /// Entries in central directory order.
    ///
    /// Entries without recorded unix attributes get mode `0` and are
    /// classified by their name.
    pub fn entries(&self) -> Result<Vec<ArchiveEntry<ZipContent>>> {
        let mut archive = self.archive.clone();
        (0..archive.len())
            .map(|index| {
                let file = archive.by_index_raw(index).map_err(|_| Error::Corrupted)?;
                let name = file.name().to_owned();
                let mode = file.unix_mode().unwrap_or(0);
                drop(file);

                let content = ZipContent {
                    archive: self.archive.clone(),
                    index,
                };
                Ok(ArchiveEntry::new(name, mode, content))
            })
            .collect()
    }
}

impl fmt::Debug for ZipIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipIndex").field("entries", &self.len()).finish()
    }
}

/// Decompressing reader for one ZIP entry.
#[derive(Clone)]
pub struct ZipContent {
    archive: ZipArchive<SharedBytes>,
    index:   usize,
}

impl ZipContent {
    pub fn index(&self) -> usize { self.index }
}

impl fmt::Debug for ZipContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipContent").field("index", &self.index).finish()
    }
}

impl EntryContent for ZipContent {
    fn copy_to(mut self, writer: &mut dyn Write, cancel: &CancellationToken) -> io::Result<u64> {
        let mut file = self.archive.by_index(self.index).map_err(io::Error::other)?;
        copy_cancellable(&mut file, writer, cancel)
    }
}
