//! Regular-file extraction pipeline.
//!
//! Entries are walked in archive order on the caller's task. Each regular
//! file is sanitized, resolved under the extraction root, given its parent
//! directories and then handed to the dispatcher, which runs at most
//! `concurrency` writes at once. Directories and symlinks are not created
//! and no metadata is restored.

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::content::ContentCopy;
use crate::dispatch::Dispatcher;
use crate::entry::{ArchiveEntry, EntryKind};
use crate::error::{Error, Result};
use crate::options::ExtractOptions;
use crate::resolve::{ExtractionRoot, create_parent};
use crate::sanitize::{Sanitized, Sanitizer};

/// Counts for a successful extraction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Regular files handed to the content copier.
    pub files:   usize,
    /// Regular files the sanitizer asked to skip.
    pub skipped: usize,
    /// Directory, symlink and irregular entries.
    pub ignored: usize,
}

#[derive(Clone, Debug)]
pub struct Extractor {
    root:    ExtractionRoot,
    options: ExtractOptions,
}

impl Extractor {
    pub fn new(root: impl AsRef<Path>, options: ExtractOptions) -> Result<Self> {
        Self::with_root(ExtractionRoot::new(root)?, options)
    }

    pub fn with_root(root: ExtractionRoot, options: ExtractOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { root, options })
    }

    pub fn root(&self) -> &ExtractionRoot { &self.root }

    pub fn options(&self) -> &ExtractOptions { &self.options }

    /// Extract the regular files of `entries` below the root.
    ///
    /// Directories, symlinks and irregular entries are ignored. The call
    /// either succeeds for every admitted file or returns the first error;
    /// writes already running when that error is recorded are asked to stop
    /// through their cancellation token and are always awaited before this
    /// returns. Cancelling `cancel` stops admission and yields
    /// [`Error::Cancelled`] unless another failure was recorded first.
    pub async fn extract_files<I, C, S, W>(
        &self,
        entries: I,
        sanitizer: &S,
        copier: W,
        cancel: &CancellationToken,
    ) -> Result<ExtractSummary>
    where
        I: IntoIterator<Item = ArchiveEntry<C>>,
        C: Send + 'static,
        S: Sanitizer + ?Sized,
        W: ContentCopy<C>,
    {
        debug!(
            root = %self.root.path().display(),
            concurrency = self.options.concurrency,
            "extracting regular files"
        );

        let mut dispatcher = Dispatcher::new(copier, self.options.concurrency, cancel.child_token());
        let mut summary = ExtractSummary::default();

        for entry in entries {
            if let Err(err) = self.process(entry, sanitizer, &mut dispatcher, &mut summary).await {
                dispatcher.fail(err);
                break;
            }
        }

        match dispatcher.finish().await {
            Some(err) => Err(err),
            None => {
                debug!(
                    files = summary.files,
                    skipped = summary.skipped,
                    ignored = summary.ignored,
                    "extraction finished"
                );
                Ok(summary)
            }
        }
    }

    async fn process<C, S, W>(
        &self,
        entry: ArchiveEntry<C>,
        sanitizer: &S,
        dispatcher: &mut Dispatcher<W>,
        summary: &mut ExtractSummary,
    ) -> Result<()>
    where
        C: Send + 'static,
        S: Sanitizer + ?Sized,
        W: ContentCopy<C>,
    {
        let kind = entry.kind();
        if kind != EntryKind::File {
            trace!(name = %entry.name, ?kind, "ignoring entry");
            summary.ignored += 1;
            return Ok(());
        }

        dispatcher.check_cancelled()?;
        let name = match sanitizer.sanitize(&entry.name) {
            Ok(Sanitized::Name(name)) => name,
            Ok(Sanitized::Skip) => {
                trace!(name = %entry.name, "skipped by sanitizer");
                summary.skipped += 1;
                return Ok(());
            }
            Err(source) => {
                return Err(Error::Sanitize {
                    name: entry.name,
                    source,
                });
            }
        };

        let destination = self.root.resolve(&name)?;
        self.root.confine(&destination).await?;
        create_parent(&destination, self.options.dir_mode).await?;

        dispatcher.check_cancelled()?;
        dispatcher.admit(destination, entry.content).await?;
        summary.files += 1;
        Ok(())
    }
}
