//! Sandboxed filesystem access
//!
//! All filesystem work on behalf of a session goes through a [`Sandbox`]:
//! a pair of directory handles (`root`, the boundary captured at session
//! start, and `cwd`, the virtual working directory) plus a `depth` counter
//! of component descents below `root`.
//!
//! Path resolution walks one segment at a time, chaining `openat` calls
//! from an existing handle with symlink following disabled at every step.
//! `..` never ascends past `root`: at depth 0 it is silently dropped. A
//! leading `/` anchors resolution at `root` instead of `cwd`. Empty
//! segments and `.` are skipped so that `depth` counts real descents only.
//!
//! Failures map onto the wire taxonomy: `ENOENT` → NonExisting, `ENOTDIR` →
//! IsNotDir, `EACCES`/`EPERM` → AccessDenied, `EISDIR` → IsNotFile, and
//! everything else (including `ELOOP` from a refused symlink) → CantOpen.

use std::ffi::OsStr;
use std::fs::File;
use std::io;
use std::os::fd::{AsFd, AsRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use rustix::fs::{openat, statat, unlinkat, AtFlags, Dir, FileType, Mode, OFlags, CWD};
use rustix::io::Errno;

use crate::error::{QooilError, Result};
use crate::protocol::ErrorKind;

/// One directory child as surfaced over the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Name bytes, without any directory component
    pub name: Vec<u8>,

    /// Whether the child is itself a directory
    pub is_dir: bool,
}

/// A session's window onto the filesystem
#[derive(Debug)]
pub struct Sandbox {
    /// The boundary directory; nothing above it is ever opened
    root: OwnedFd,

    /// Current virtual working directory, always at `depth` descents below
    /// `root`
    cwd: OwnedFd,

    /// Component descents separating `cwd` from `root`
    depth: u32,
}

impl Sandbox {
    /// Capture the process working directory as the sandbox root
    pub fn new() -> io::Result<Self> {
        Self::with_root(".")
    }

    /// Capture `root` as the sandbox boundary
    pub fn with_root(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = openat(CWD, root.as_ref(), dir_flags(), Mode::empty())?;
        let cwd = root.try_clone()?;
        Ok(Self {
            root,
            cwd,
            depth: 0,
        })
    }

    /// Descents separating the virtual working directory from the root
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Replace the virtual working directory
    ///
    /// The old handle is released once the new one is installed.
    pub fn chdir(&mut self, path: &[u8]) -> Result<()> {
        let (fd, depth) = self.open_dir(path)?;
        self.cwd = fd;
        self.depth = depth;
        Ok(())
    }

    /// Resolve `path` to a directory handle and its depth below root
    pub fn open_dir(&self, path: &[u8]) -> Result<(OwnedFd, u32)> {
        let mut walk = self.walk_start(path)?;
        for segment in segments(path) {
            self.walk_step(&mut walk, segment)?;
        }
        Ok((walk.fd, walk.depth))
    }

    /// Open the regular file at `path` for reading; returns the file and
    /// its stat-reported size
    pub fn open_file(&self, path: &[u8]) -> Result<(File, u64)> {
        let (parent, name) = self.open_parent(path)?;
        let fd = openat(
            &parent,
            name,
            OFlags::RDONLY | OFlags::NOFOLLOW | OFlags::CLOEXEC,
            Mode::empty(),
        )
        .map_err(map_errno)?;
        let stat = rustix::fs::fstat(&fd).map_err(map_errno)?;
        if FileType::from_raw_mode(stat.st_mode) != FileType::RegularFile {
            return Err(QooilError::protocol(ErrorKind::IsNotFile));
        }
        Ok((File::from(fd), stat.st_size as u64))
    }

    /// Create (or truncate) the regular file at `path` for writing
    pub fn create_file(&self, path: &[u8]) -> Result<File> {
        let (parent, name) = self.open_parent(path)?;
        let fd = openat(
            &parent,
            name,
            OFlags::WRONLY | OFlags::CREATE | OFlags::TRUNC | OFlags::NOFOLLOW | OFlags::CLOEXEC,
            Mode::from_raw_mode(0o644),
        )
        .map_err(map_errno)?;
        Ok(File::from(fd))
    }

    /// Unlink the regular file at `path`
    pub fn remove_file(&self, path: &[u8]) -> Result<()> {
        let (parent, name) = self.open_parent(path)?;
        let stat = statat(&parent, name, AtFlags::SYMLINK_NOFOLLOW).map_err(map_errno)?;
        if FileType::from_raw_mode(stat.st_mode) != FileType::RegularFile {
            return Err(QooilError::protocol(ErrorKind::IsNotFile));
        }
        unlinkat(&parent, name, AtFlags::empty()).map_err(map_errno)?;
        Ok(())
    }

    /// Collect the children of the directory at `path`
    ///
    /// `.` and `..` are excluded; everything else is reported verbatim, in
    /// filesystem order, without deduplication.
    pub fn read_dir(&self, path: &[u8]) -> Result<Vec<EntryInfo>> {
        let (fd, _) = self.open_dir(path)?;
        let dir = Dir::read_from(&fd).map_err(map_errno)?;

        let mut entries = Vec::new();
        for item in dir {
            let item = item.map_err(map_errno)?;
            let name = item.file_name().to_bytes();
            if name == b"." || name == b".." {
                continue;
            }
            if name.len() > u8::MAX as usize {
                // Cannot be framed in an Entry header; no Linux filesystem
                // produces such a name.
                tracing::warn!("skipping over-long entry name ({} bytes)", name.len());
                continue;
            }
            let is_dir = match item.file_type() {
                FileType::Directory => true,
                FileType::Unknown => statat(&fd, item.file_name(), AtFlags::SYMLINK_NOFOLLOW)
                    .map(|st| FileType::from_raw_mode(st.st_mode) == FileType::Directory)
                    .unwrap_or(false),
                _ => false,
            };
            entries.push(EntryInfo {
                name: name.to_vec(),
                is_dir,
            });
        }
        Ok(entries)
    }

    /// The virtual path of `cwd`: the real path of `cwd` minus the real
    /// path of `root`, or `/` when they coincide
    pub fn virtual_path(&self) -> io::Result<Vec<u8>> {
        let root = real_path(&self.root)?;
        let cwd = real_path(&self.cwd)?;

        let root_bytes = root.as_os_str().as_bytes();
        let cwd_bytes = cwd.as_os_str().as_bytes();
        let suffix = cwd_bytes.strip_prefix(root_bytes).unwrap_or(cwd_bytes);
        if suffix.is_empty() {
            Ok(b"/".to_vec())
        } else {
            Ok(suffix.to_vec())
        }
    }

    /// Begin a walk at `root` (absolute path) or `cwd` (relative path)
    fn walk_start(&self, path: &[u8]) -> Result<Walk> {
        let (anchor, depth) = if path.first() == Some(&b'/') {
            (&self.root, 0)
        } else {
            (&self.cwd, self.depth)
        };
        let fd = anchor.try_clone().map_err(QooilError::Io)?;
        Ok(Walk { fd, depth })
    }

    /// Descend (or ascend) one segment
    fn walk_step(&self, walk: &mut Walk, segment: &OsStr) -> Result<()> {
        if segment.as_bytes() == b".." {
            // The sandbox invariant: never ascend past root.
            if walk.depth > 0 {
                walk.fd =
                    openat(&walk.fd, "..", dir_flags(), Mode::empty()).map_err(map_errno)?;
                walk.depth -= 1;
            }
            return Ok(());
        }
        walk.fd = openat(&walk.fd, segment, dir_flags(), Mode::empty()).map_err(map_errno)?;
        walk.depth += 1;
        Ok(())
    }

    /// Resolve everything but the final name segment; returns the parent
    /// directory handle and the name
    ///
    /// A path with no final name segment (empty, or ending in `..`) denotes
    /// a directory, never a file.
    fn open_parent<'p>(&self, path: &'p [u8]) -> Result<(OwnedFd, &'p OsStr)> {
        let parts: Vec<&OsStr> = segments(path).collect();
        match parts.split_last() {
            Some((name, prefix)) if name.as_bytes() != b".." => {
                let mut walk = self.walk_start(path)?;
                for segment in prefix {
                    self.walk_step(&mut walk, segment)?;
                }
                Ok((walk.fd, *name))
            }
            _ => Err(QooilError::protocol(ErrorKind::IsNotFile)),
        }
    }
}

/// In-flight state of a segment walk
struct Walk {
    fd: OwnedFd,
    depth: u32,
}

/// The real absolute path behind a directory or file handle
pub fn real_path(fd: impl AsFd) -> io::Result<PathBuf> {
    std::fs::read_link(format!("/proc/self/fd/{}", fd.as_fd().as_raw_fd()))
}

fn dir_flags() -> OFlags {
    OFlags::RDONLY | OFlags::DIRECTORY | OFlags::NOFOLLOW | OFlags::CLOEXEC
}

/// Path segments: split on `/`, dropping empties (collapses `//`) and `.`
fn segments(path: &[u8]) -> impl Iterator<Item = &OsStr> {
    path.split(|b| *b == b'/')
        .filter(|s| !s.is_empty() && *s != b".")
        .map(OsStr::from_bytes)
}

/// Map an OS error onto the wire taxonomy
fn map_errno(errno: Errno) -> QooilError {
    let kind = if errno == Errno::NOENT {
        ErrorKind::NonExisting
    } else if errno == Errno::NOTDIR {
        ErrorKind::IsNotDir
    } else if errno == Errno::ACCESS || errno == Errno::PERM {
        ErrorKind::AccessDenied
    } else if errno == Errno::ISDIR {
        ErrorKind::IsNotFile
    } else {
        ErrorKind::CantOpen
    };
    QooilError::protocol(kind)
}
