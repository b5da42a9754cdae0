use std::num::NonZeroUsize;

use crate::error::{Error, Result};

/// Mode for directories created on the way to an extracted file (before umask).
pub const DEFAULT_DIR_MODE: u32 = 0o777;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtractOptions {
    pub concurrency: usize,
    pub dir_mode:    u32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            concurrency: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            dir_mode:    DEFAULT_DIR_MODE,
        }
    }
}

impl ExtractOptions {
    /// Maximum number of file writes in flight at once.
    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n;
        self
    }

    /// Ignored on platforms without unix permissions.
    pub fn dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = mode;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::InvalidConcurrency);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_options_default() {
        let options = ExtractOptions::default();
        assert!(options.concurrency >= 1);
        assert_eq!(options.dir_mode, DEFAULT_DIR_MODE);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn extract_options_builder_pattern() {
        let options = ExtractOptions::default().concurrency(3).dir_mode(0o750);
        assert_eq!(options.concurrency, 3);
        assert_eq!(options.dir_mode, 0o750);
    }

    #[test]
    fn zero_concurrency_rejected() {
        let options = ExtractOptions::default().concurrency(0);
        assert!(matches!(options.validate(), Err(Error::InvalidConcurrency)));
    }
}
