use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use walkdir::WalkDir;

/// Pause between retries of a transient failure.
const RETRY_BACKOFF: Duration = Duration::from_millis(10);

/// Returns an error unless `path` exists and is a directory.
pub fn assert_dir(path: &str) -> io::Result<()> {
    let meta = fs::metadata(path)?;
    if !meta.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not a directory: {path}"),
        ));
    }
    Ok(())
}

pub fn is_dir(path: &str) -> bool {
    assert_dir(path).is_ok()
}

/// True if `dir` contains at least one regular file, recursing into
/// subdirectories when `recursive` is set. Stops at the first hit.
pub fn has_any_file(dir: &str, recursive: bool) -> bool {
    let max_depth = if recursive { usize::MAX } else { 1 };
    WalkDir::new(dir)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .any(|entry| entry.file_type().is_file())
}

/// True if both paths refer to the same directory once resolved.
pub fn same_dir(path1: &str, path2: &str) -> io::Result<bool> {
    let p1 = fs::canonicalize(path1)?;
    let p2 = fs::canonicalize(path2)?;
    Ok(p1 == p2)
}

/// True if `child` resolves to a directory strictly inside `parent`.
pub fn is_subdir_of(child: &str, parent: &str) -> io::Result<bool> {
    let child = fs::canonicalize(child)?;
    let parent = fs::canonicalize(parent)?;
    Ok(child != parent && child.starts_with(&parent))
}

/// Copies `src` to `dst` without overwriting, retrying transient failures
/// up to `max_tries` attempts. Returns the number of bytes copied.
pub fn copy_file(src: &str, dst: &str, max_tries: u32) -> io::Result<u64> {
    with_retries(max_tries, || copy_once(src, dst))
}

/// Moves `src` to `dst` without overwriting, retrying transient failures
/// up to `max_tries` attempts. Falls back to copy-and-remove when a rename
/// is not possible (e.g. across filesystems).
pub fn move_file(src: &str, dst: &str, max_tries: u32) -> io::Result<()> {
    with_retries(max_tries, || move_once(src, dst))
}

fn copy_once(src: &str, dst: &str) -> io::Result<u64> {
    let mut reader = fs::File::open(src)?;
    let mut writer = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dst)?;
    match io::copy(&mut reader, &mut writer) {
        Ok(n) => Ok(n),
        Err(err) => {
            // Drop the partial destination so a retry starts clean.
            drop(writer);
            let _ = fs::remove_file(dst);
            Err(err)
        }
    }
}

fn move_once(src: &str, dst: &str) -> io::Result<()> {
    if Path::new(dst).exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("destination already exists: {dst}"),
        ));
    }
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(_) => {
            copy_once(src, dst)?;
            fs::remove_file(src)
        }
    }
}

fn with_retries<T>(max_tries: u32, mut attempt: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let max_tries = max_tries.max(1);
    let mut tries = 0;
    loop {
        tries += 1;
        match attempt() {
            Ok(value) => return Ok(value),
            Err(err) if tries < max_tries && is_transient(&err) => {
                debug!("transient failure (attempt {tries}/{max_tries}): {err}");
                std::thread::sleep(RETRY_BACKOFF);
            }
            Err(err) => return Err(err),
        }
    }
}

/// Failures worth retrying: contention and transient I/O. Anything
/// structural (missing source, existing destination, bad path) fails fast.
fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
            | io::ErrorKind::PermissionDenied
    )
}
