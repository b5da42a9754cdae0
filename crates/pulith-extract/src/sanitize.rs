//! Entry name sanitization strategies.
//!
//! A [`Sanitizer`] maps a raw, untrusted archive name to the name used
//! below the extraction root. It has three outcomes: a name to extract, a
//! request to skip the entry, or an error that aborts the whole extraction.
//! Any `Fn(&str) -> Result<Sanitized, SanitizeError>` is a sanitizer.
//!
//! Sanitizing is policy, not protection: whatever a sanitizer returns is
//! still confined to the root by the resolver.

/// Outcome of a successful sanitization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sanitized {
    Name(String),
    Skip,
}

impl Sanitized {
    pub fn name(name: impl Into<String>) -> Self { Self::Name(name.into()) }

    pub fn is_skip(&self) -> bool { matches!(self, Self::Skip) }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct SanitizeError {
    reason: String,
}

impl SanitizeError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str { &self.reason }
}

pub trait Sanitizer {
    fn sanitize(&self, raw: &str) -> Result<Sanitized, SanitizeError>;
}

impl<F> Sanitizer for F
where
    F: Fn(&str) -> Result<Sanitized, SanitizeError>,
{
    fn sanitize(&self, raw: &str) -> Result<Sanitized, SanitizeError> { self(raw) }
}

/// Passes every name through unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl Sanitizer for Identity {
    fn sanitize(&self, raw: &str) -> Result<Sanitized, SanitizeError> {
        Ok(Sanitized::Name(raw.to_owned()))
    }
}

/// Drops the first `n` path components, skipping entries that have none left.
#[derive(Clone, Copy, Debug)]
pub struct StripComponents(pub usize);

impl Sanitizer for StripComponents {
    fn sanitize(&self, raw: &str) -> Result<Sanitized, SanitizeError> {
        let parts: Vec<&str> = components(raw).collect();
        if parts.len() <= self.0 {
            return Ok(Sanitized::Skip);
        }
        Ok(Sanitized::Name(parts[self.0..].join("/")))
    }
}

/// Rejects names that are absolute, contain `..` or contain a null byte.
///
/// Accepted names are rewritten with `/` separators and without `.` parts.
#[derive(Clone, Copy, Debug, Default)]
pub struct RejectTraversal;

impl Sanitizer for RejectTraversal {
    fn sanitize(&self, raw: &str) -> Result<Sanitized, SanitizeError> {
        if raw.contains('\0') {
            return Err(SanitizeError::new("entry name contains null byte"));
        }
        if raw.starts_with('/') || raw.starts_with('\\') || has_drive_prefix(raw) {
            return Err(SanitizeError::new(format!("absolute path not allowed: {raw}")));
        }

        let mut parts = Vec::new();
        for part in components(raw) {
            if part == ".." {
                return Err(SanitizeError::new(format!(
                    "parent directory traversal not allowed: {raw}"
                )));
            }
            parts.push(part);
        }

        if parts.is_empty() {
            return Ok(Sanitized::Skip);
        }
        Ok(Sanitized::Name(parts.join("/")))
    }
}

/// Non-empty, non-`.` components of an archive name, split on either separator.
fn components(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != ".")
}

fn has_drive_prefix(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
