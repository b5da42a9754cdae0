//! Bounded-parallel extraction of regular archive files with chroot confinement.
//!
//! # Architecture
//!
//! - `entry.rs` - Archive entry records and kind classification
//! - `sanitize.rs` - Pluggable entry name sanitization
//! - `resolve.rs` - Destination resolution and containment checks
//! - `dispatch.rs` - Concurrency-limited write dispatch, first-error slot
//! - `extract.rs` - The extraction pipeline
//! - `content.rs` - Content-copy collaborators
//! - `zip_index.rs` - ZIP archive index (feature `zip`)
//!
//! Only regular files are written. Directory entries, symlinks and irregular
//! files are ignored, and no timestamps, permissions or extended attributes
//! are restored; directories are created only as parents of extracted files.
//!
//! ```no_run
//! # async fn run() -> pulith_extract::Result<()> {
//! use pulith_extract::{ExtractOptions, Extractor, FileWriter, RejectTraversal, ZipIndex};
//! use tokio_util::sync::CancellationToken;
//!
//! let index = ZipIndex::open("tool-1.0.zip")?;
//! let extractor = Extractor::new("/opt/tool", ExtractOptions::default().concurrency(4))?;
//! let summary = extractor
//!     .extract_files(index.entries()?, &RejectTraversal, FileWriter, &CancellationToken::new())
//!     .await?;
//! println!("extracted {} files", summary.files);
//! # Ok(())
//! # }
//! ```

pub use content::{ContentCopy, EntryContent, FileWriter, copy_cancellable};
pub use entry::{ArchiveEntry, EntryKind};
pub use error::{Error, Result};
pub use extract::{ExtractSummary, Extractor};
pub use options::ExtractOptions;
pub use resolve::ExtractionRoot;
pub use sanitize::{Identity, RejectTraversal, SanitizeError, Sanitized, Sanitizer, StripComponents};
#[cfg(feature = "zip")]
pub use zip_index::{ZipContent, ZipIndex};

pub mod content;
pub mod entry;
pub mod options;
pub mod sanitize;
mod dispatch;
mod error;
mod extract;
mod resolve;
#[cfg(feature = "zip")]
mod zip_index;
