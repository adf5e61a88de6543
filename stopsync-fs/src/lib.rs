//! Capability-based filesystem helpers for the snapshot cache and run marker.
//!
//! Every helper resolves an ambient directory for the parent of the target and
//! then operates relative to it, so callers only ever hand over UTF-8 paths.
#![forbid(unsafe_code)]

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io::{self, Write};
use std::path::Component;

/// Resolve an ambient directory for the parent of `path` and return it with
/// the file name.
pub fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other(format!("{path} does not name a file")))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Create `dir` and any missing ancestors.
pub fn ensure_dir(dir: &Utf8Path) -> io::Result<()> {
    if dir.as_str().is_empty() || dir == Utf8Path::new("/") {
        return Ok(());
    }
    let (base, relative) = base_dir_and_relative(dir)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base.create_dir_all(&relative)
}

/// Create the parent directory of `path` when it is missing.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    path.parent().map_or(Ok(()), ensure_dir)
}

/// Create `path` only if it does not exist yet.
///
/// Fails with [`io::ErrorKind::AlreadyExists`] when something is already
/// present at `path`; the check and the creation are a single operation.
pub fn create_new_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    let (dir, name) = open_dir_and_file(path)?;
    let mut options = fs_utf8::OpenOptions::new();
    options.write(true).create_new(true);
    dir.open_with(name.as_str(), &options)
}

/// Remove the file at `path`.
pub fn remove_file(path: &Utf8Path) -> io::Result<()> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.remove_file(name.as_str())
}

/// Read the file at `path`, treating a missing file or directory as `None`.
pub fn read_optional(path: &Utf8Path) -> io::Result<Option<Vec<u8>>> {
    let opened = open_dir_and_file(path).and_then(|(dir, name)| dir.read(name.as_str()));
    match opened {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Replace the contents of `path` with `contents`.
///
/// The bytes are written to a sibling temporary file which is then renamed
/// over the target, so readers observe either the old or the new contents.
pub fn replace_file(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    ensure_parent_dir(path)?;
    let (dir, name) = open_dir_and_file(path)?;
    let staging = format!(".{name}.partial");
    let written = write_staging(&dir, &staging, contents)
        .and_then(|()| dir.rename(staging.as_str(), &dir, name.as_str()));
    if written.is_err() {
        // The staging file may not exist; the original error is what matters.
        let _ = dir.remove_file(staging.as_str());
    }
    written
}

fn write_staging(dir: &fs_utf8::Dir, staging: &str, contents: &[u8]) -> io::Result<()> {
    let mut file = dir.create(staging)?;
    file.write_all(contents)?;
    file.sync_all()
}

/// Return whether `path` exists and is a regular file.
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = open_dir_and_file(path)?;
    match dir.metadata(name.as_str()) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Split a path into an ambient base directory and the suffix below it.
///
/// Absolute paths are anchored at their root (or drive prefix on Windows).
/// Relative paths are anchored at the current directory, with any leading
/// `..` components folded into the base so the suffix never climbs out of it.
pub fn base_dir_and_relative(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_path = path.as_std_path();
    let (base, relative) = match std_path.components().next() {
        Some(Component::Prefix(prefix)) => {
            let drive = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            let base = Utf8PathBuf::from(drive).join(std::path::MAIN_SEPARATOR_STR);
            let relative = path
                .strip_prefix(&base)
                .or_else(|_| path.strip_prefix(drive))
                .map_err(|_| io::Error::other(format!("cannot strip {drive} from {path}")))?;
            (base, relative.to_owned())
        }
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR_STR);
            let relative = path
                .strip_prefix(&base)
                .map_err(|_| io::Error::other(format!("cannot strip root from {path}")))?;
            (base, relative.to_owned())
        }
        _ => split_leading_parents(path),
    };
    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    Ok((dir, relative))
}

fn split_leading_parents(path: &Utf8Path) -> (Utf8PathBuf, Utf8PathBuf) {
    let mut base = Utf8PathBuf::from(".");
    let mut relative = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::ParentDir if relative.as_str().is_empty() => base.push(".."),
            Utf8Component::CurDir => {}
            other => relative.push(other.as_str()),
        }
    }
    (base, relative)
}
