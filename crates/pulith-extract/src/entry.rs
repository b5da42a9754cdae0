/// Mask selecting the file type bits of a unix mode.
pub const TYPE_MASK: u32 = 0o170000;

pub const MODE_FILE: u32 = 0o100000;
pub const MODE_DIR: u32 = 0o040000;
pub const MODE_SYMLINK: u32 = 0o120000;

/// Represents one record of an archive index.
///
/// The name is raw and untrusted: it uses the archive's own separators and
/// may contain traversal components. `content` is whatever the archive
/// collaborator hands out to read the entry's bytes.
#[derive(Clone, Debug)]
pub struct ArchiveEntry<C> {
    pub name:    String,
    pub mode:    u32,
    pub content: C,
}

impl<C> ArchiveEntry<C> {
    pub fn new(name: impl Into<String>, mode: u32, content: C) -> Self {
        Self {
            name: name.into(),
            mode,
            content,
        }
    }

    /// Regular file with `0o644` permissions.
    pub fn file(name: impl Into<String>, content: C) -> Self {
        Self::new(name, MODE_FILE | 0o644, content)
    }

    pub fn directory(name: impl Into<String>, content: C) -> Self {
        Self::new(name, MODE_DIR | 0o755, content)
    }

    pub fn symlink(name: impl Into<String>, content: C) -> Self {
        Self::new(name, MODE_SYMLINK | 0o777, content)
    }

    pub fn kind(&self) -> EntryKind { EntryKind::classify(&self.name, self.mode) }

    pub fn is_file(&self) -> bool { matches!(self.kind(), EntryKind::File) }

    pub fn is_directory(&self) -> bool { matches!(self.kind(), EntryKind::Directory) }

    pub fn is_symlink(&self) -> bool { matches!(self.kind(), EntryKind::Symlink) }

    /// Permission bits without the file type.
    pub fn permissions(&self) -> u32 { self.mode & 0o7777 }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    /// Device, fifo or socket.
    Irregular,
}

impl EntryKind {
    /// Classify an entry from its unix mode.
    ///
    /// Archives that record no type bits at all (many ZIP writers) mark
    /// directories with a trailing separator instead.
    pub fn classify(name: &str, mode: u32) -> Self {
        match mode & TYPE_MASK {
            0 if name.ends_with('/') || name.ends_with('\\') => Self::Directory,
            0 | MODE_FILE => Self::File,
            MODE_DIR => Self::Directory,
            MODE_SYMLINK => Self::Symlink,
            _ => Self::Irregular,
        }
    }
}
