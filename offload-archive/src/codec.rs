//! Deterministic tar + zstd directory codec.
//!
//! ## Format
//!
//! A tar stream (GNU headers) compressed with zstd. Each entry carries its
//! path relative to the pack root, its size, and a 9-bit mode produced by
//! [`PermissionSet::to_mode`]. Entries are written depth-first with siblings
//! sorted by file name and every directory preceding its contents. Mtime,
//! uid and gid are zeroed, so packing unchanged content is byte-identical.
//!
//! Symlinks and special files are not archived.
//!
//! ## Extraction
//!
//! Not transactional: a failure part-way leaves a half-populated destination.
//! Entries the stream cannot decode, and entries whose path would escape the
//! destination, are skipped with a warning. File contents are streamed to
//! disk; an entry whose data ends before its declared size is removed and
//! ends extraction.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

use tar::{EntryType, Header};
use tracing::{debug, warn};

use crate::error::{io_err, ArchiveError};
use crate::permissions::PermissionSet;

/// zstd level used for every archive; fixed so output stays stable.
pub const COMPRESSION_LEVEL: i32 = 3;

/// Counts from one [`unpack`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnpackSummary {
    pub files: usize,
    pub directories: usize,
    pub skipped: usize,
}

// ---------------------------------------------------------------------------
// pack
// ---------------------------------------------------------------------------

/// Pack every regular file and directory under `root` into compressed bytes.
pub fn pack(root: &Path) -> Result<Vec<u8>, ArchiveError> {
    let meta = fs::metadata(root).map_err(|e| io_err(root, e))?;
    if !meta.is_dir() {
        return Err(ArchiveError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let encoder = zstd::Encoder::new(Vec::new(), COMPRESSION_LEVEL).map_err(|e| io_err(root, e))?;
    let mut builder = tar::Builder::new(encoder);
    let mut entries = 0usize;
    walk(root, Path::new(""), &mut builder, &mut entries)?;

    let encoder = builder.into_inner().map_err(|e| io_err(root, e))?;
    let bytes = encoder.finish().map_err(|e| io_err(root, e))?;

    debug!(
        root = %root.display(),
        entries,
        compressed_size = bytes.len(),
        "packed directory"
    );
    Ok(bytes)
}

/// [`pack`] and write the result to `out`.
pub fn pack_to_file(root: &Path, out: &Path) -> Result<u64, ArchiveError> {
    let bytes = pack(root)?;
    fs::write(out, &bytes).map_err(|e| io_err(out, e))?;
    Ok(bytes.len() as u64)
}

fn walk<W: Write>(
    root: &Path,
    relative: &Path,
    builder: &mut tar::Builder<W>,
    entries: &mut usize,
) -> Result<(), ArchiveError> {
    let dir = root.join(relative);
    let mut children = fs::read_dir(&dir)
        .map_err(|e| io_err(&dir, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| io_err(&dir, e))?;
    children.sort_by_key(|e| e.file_name());

    for child in children {
        let path = child.path();
        let file_type = child.file_type().map_err(|e| io_err(&path, e))?;
        let child_relative = relative.join(child.file_name());

        if file_type.is_dir() {
            let meta = child.metadata().map_err(|e| io_err(&path, e))?;
            let mut header = header_for(EntryType::Directory, 0, &meta);
            builder
                .append_data(&mut header, &child_relative, io::empty())
                .map_err(|e| io_err(&path, e))?;
            *entries += 1;
            walk(root, &child_relative, builder, entries)?;
        } else if file_type.is_file() {
            let meta = child.metadata().map_err(|e| io_err(&path, e))?;
            let file = fs::File::open(&path).map_err(|e| io_err(&path, e))?;
            let mut header = header_for(EntryType::Regular, meta.len(), &meta);
            builder
                .append_data(&mut header, &child_relative, file)
                .map_err(|e| io_err(&path, e))?;
            *entries += 1;
        } else {
            debug!(path = %path.display(), "skipping non-regular entry");
        }
    }
    Ok(())
}

fn header_for(kind: EntryType, size: u64, meta: &fs::Metadata) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(kind);
    header.set_size(size);
    header.set_mode(PermissionSet::from_mode(mode_of(meta)).to_mode());
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header
}

#[cfg(unix)]
fn mode_of(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode()
}

#[cfg(not(unix))]
fn mode_of(meta: &fs::Metadata) -> u32 {
    match (meta.is_dir(), meta.permissions().readonly()) {
        (true, _) => 0o755,
        (false, true) => 0o444,
        (false, false) => 0o644,
    }
}

// ---------------------------------------------------------------------------
// unpack
// ---------------------------------------------------------------------------

/// Extract compressed archive bytes into `dest`, creating it if needed.
pub fn unpack(bytes: &[u8], dest: &Path) -> Result<UnpackSummary, ArchiveError> {
    unpack_from(bytes, dest)
}

/// Extract an archive file into `dest`.
pub fn unpack_file(archive: &Path, dest: &Path) -> Result<UnpackSummary, ArchiveError> {
    let file = fs::File::open(archive).map_err(|e| io_err(archive, e))?;
    unpack_from(io::BufReader::new(file), dest)
}

fn unpack_from<R: Read>(reader: R, dest: &Path) -> Result<UnpackSummary, ArchiveError> {
    ensure_dir(dest)?;
    let decoder = zstd::Decoder::new(reader).map_err(|e| io_err(dest, e))?;
    let mut archive = tar::Archive::new(decoder);
    let mut summary = UnpackSummary::default();

    let entries = archive.entries().map_err(|e| io_err(dest, e))?;
    for entry in entries {
        let mut entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable archive entry");
                summary.skipped += 1;
                continue;
            }
        };

        let raw_path = match entry.path() {
            Ok(path) => path.into_owned(),
            Err(err) => {
                warn!(error = %err, "skipping entry with undecodable path");
                summary.skipped += 1;
                continue;
            }
        };
        let Some(relative) = safe_relative(&raw_path) else {
            warn!(path = %raw_path.display(), "skipping entry outside destination");
            summary.skipped += 1;
            continue;
        };
        let target = dest.join(&relative);

        match entry.header().entry_type() {
            EntryType::Directory => {
                ensure_dir(&target)?;
                summary.directories += 1;
            }
            EntryType::Regular | EntryType::Continuous => {
                let permissions = match entry.header().mode() {
                    Ok(mode) => PermissionSet::from_mode(mode),
                    Err(err) => {
                        warn!(path = %relative.display(), error = %err, "skipping entry with unreadable mode");
                        summary.skipped += 1;
                        continue;
                    }
                };
                let expected = entry.size();
                let written = match extract_file(&mut entry, &target) {
                    Ok(written) => written,
                    Err(Extract::Fatal(err)) => return Err(err),
                    Err(Extract::Unreadable(err)) => {
                        warn!(path = %relative.display(), error = %err, "skipping entry with unreadable contents");
                        discard(&target);
                        summary.skipped += 1;
                        continue;
                    }
                };
                if written < expected {
                    // The stream ended inside this entry; nothing after it is readable.
                    warn!(
                        path = %relative.display(),
                        expected,
                        written,
                        "skipping truncated entry"
                    );
                    discard(&target);
                    summary.skipped += 1;
                    break;
                }
                set_mode(&target, permissions.to_mode())?;
                summary.files += 1;
            }
            other => {
                debug!(path = %relative.display(), kind = ?other, "ignoring unsupported entry type");
                summary.skipped += 1;
            }
        }
    }

    debug!(
        dest = %dest.display(),
        files = summary.files,
        directories = summary.directories,
        skipped = summary.skipped,
        "unpacked archive"
    );
    Ok(summary)
}

enum Extract {
    /// The destination could not be written.
    Fatal(ArchiveError),
    /// The archive stream failed while reading the entry.
    Unreadable(io::Error),
}

/// Stream one entry into `target`, returning the number of bytes written.
fn extract_file<R: Read>(entry: &mut R, target: &Path) -> Result<u64, Extract> {
    if let Some(parent) = target.parent() {
        ensure_dir(parent).map_err(Extract::Fatal)?;
    }
    // A previous extraction may have left a read-only file here.
    match fs::remove_file(target) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(Extract::Fatal(io_err(target, err))),
    }
    let mut file = fs::File::create(target).map_err(|e| Extract::Fatal(io_err(target, e)))?;

    let mut buf = [0u8; 64 * 1024];
    let mut written = 0u64;
    loop {
        let n = match entry.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(Extract::Unreadable(err)),
        };
        file.write_all(&buf[..n])
            .map_err(|e| Extract::Fatal(io_err(target, e)))?;
        written += n as u64;
    }
    Ok(written)
}

/// Best-effort removal of a partially written file.
fn discard(target: &Path) {
    if let Err(err) = fs::remove_file(target) {
        if err.kind() != io::ErrorKind::NotFound {
            debug!(path = %target.display(), error = %err, "could not remove partial file");
        }
    }
}

/// Create `path` and its ancestors. An existing directory is fine.
fn ensure_dir(path: &Path) -> Result<(), ArchiveError> {
    match fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(err) => Err(ArchiveError::DirectoryCreation {
            path: path.to_path_buf(),
            source: err,
        }),
    }
}

/// Relative path with only normal components, or `None` if it would escape.
fn safe_relative(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), ArchiveError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_mode(path: &Path, mode: u32) -> Result<(), ArchiveError> {
    let mut perms = fs::metadata(path).map_err(|e| io_err(path, e))?.permissions();
    perms.set_readonly(mode & 0o200 == 0);
    fs::set_permissions(path, perms).map_err(|e| io_err(path, e))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
