//! Content-copy collaborators.
//!
//! The extractor never reads entry bytes itself. Each admitted file is handed
//! to a [`ContentCopy`] implementation together with its destination and the
//! shared cancellation token. [`FileWriter`] is the stock implementation for
//! any [`EntryContent`].

use std::future::Future;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

const BUFFER_SIZE: usize = 8192;

/// Readable bytes of one archive entry.
pub trait EntryContent: Send + 'static {
    /// Stream the entry into `writer`, returning the number of bytes written.
    ///
    /// Implementations should stop with [`io::ErrorKind::Interrupted`] once
    /// `cancel` fires.
    fn copy_to(self, writer: &mut dyn Write, cancel: &CancellationToken) -> io::Result<u64>;
}

impl EntryContent for Vec<u8> {
    fn copy_to(self, writer: &mut dyn Write, cancel: &CancellationToken) -> io::Result<u64> {
        copy_cancellable(&mut self.as_slice(), writer, cancel)
    }
}

impl EntryContent for &'static [u8] {
    fn copy_to(self, writer: &mut dyn Write, cancel: &CancellationToken) -> io::Result<u64> {
        copy_cancellable(&mut &*self, writer, cancel)
    }
}

impl EntryContent for Arc<[u8]> {
    fn copy_to(self, writer: &mut dyn Write, cancel: &CancellationToken) -> io::Result<u64> {
        copy_cancellable(&mut &self[..], writer, cancel)
    }
}

/// Writes one entry's content to its destination.
///
/// Called concurrently from up to `concurrency` tasks. Any async closure
/// `Fn(PathBuf, C, CancellationToken) -> impl Future<Output = io::Result<()>>`
/// implements this trait.
pub trait ContentCopy<C>: Send + Sync + 'static {
    fn copy(
        &self,
        destination: PathBuf,
        content: C,
        cancel: CancellationToken,
    ) -> impl Future<Output = io::Result<()>> + Send;
}

impl<C, F, Fut> ContentCopy<C> for F
where
    F: Fn(PathBuf, C, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = io::Result<()>> + Send,
{
    fn copy(
        &self,
        destination: PathBuf,
        content: C,
        cancel: CancellationToken,
    ) -> impl Future<Output = io::Result<()>> + Send {
        self(destination, content, cancel)
    }
}

/// Creates (or truncates) the destination file and streams the content into it
/// on the blocking thread pool.
///
/// No permissions, timestamps or other metadata are applied.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileWriter;

impl<C: EntryContent> ContentCopy<C> for FileWriter {
    fn copy(
        &self,
        destination: PathBuf,
        content: C,
        cancel: CancellationToken,
    ) -> impl Future<Output = io::Result<()>> + Send {
        async move {
            tokio::task::spawn_blocking(move || write_file(&destination, content, &cancel))
                .await
                .map_err(io::Error::other)?
        }
    }
}

fn write_file<C: EntryContent>(
    destination: &Path,
    content: C,
    cancel: &CancellationToken,
) -> io::Result<()> {
    let file = std::fs::File::create(destination)?;
    let mut writer = BufWriter::new(file);
    content.copy_to(&mut writer, cancel)?;
    writer.flush()
}

/// `io::copy` that gives up between chunks once `cancel` fires.
pub fn copy_cancellable<R, W>(
    reader: &mut R,
    writer: &mut W,
    cancel: &CancellationToken,
) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut written = 0u64;

    loop {
        if cancel.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "extraction cancelled"));
        }
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buffer[..n])?;
        written += n as u64;
    }

    Ok(written)
}
