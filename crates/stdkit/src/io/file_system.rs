/* 📖 # Why free functions over std::fs instead of a filesystem trait object?

Each operation is a single native call plus error translation; there is no state to carry.
Every call goes through `catcher::run_io`, which turns the `io::Error` into a
`FileError` naming the path, and then gets the failed operation attached as context.
Callers get one error shape for every filesystem failure, whichever call produced it.
*/

use std::fs::{self, DirBuilder, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use stdkit_base::catcher::run_io;
use stdkit_base::{ResultExt, StdkitResult};
use tracing::{debug, instrument};

/// How [`write`] opens the target file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Append to the file instead of replacing its contents.
    pub append: bool,
    /// Hold an exclusive lock on the file while writing.
    pub lock: bool,
}

#[instrument(skip_all, fields(source = %source.as_ref().display(), destination = %destination.as_ref().display()))]
pub fn copy(source: impl AsRef<Path>, destination: impl AsRef<Path>) -> StdkitResult<()> {
    let (source, destination) = (source.as_ref(), destination.as_ref());
    let copied = run_io(source, || fs::copy(source, destination))
        .with_context(|| format!("The copy operation to {} failed", destination.display()))?;
    debug!(copied, "copied file");
    Ok(())
}

#[instrument(skip_all, fields(source = %source.as_ref().display(), destination = %destination.as_ref().display()))]
pub fn move_path(source: impl AsRef<Path>, destination: impl AsRef<Path>) -> StdkitResult<()> {
    let (source, destination) = (source.as_ref(), destination.as_ref());
    run_io(source, || fs::rename(source, destination))
        .with_context(|| format!("The move operation to {} failed", destination.display()))
}

/// Deletes a file, a symbolic link or an empty directory.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn delete(path: impl AsRef<Path>) -> StdkitResult<()> {
    let path = path.as_ref();
    run_io(path, || {
        if fs::symlink_metadata(path)?.is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        }
    })
    .context("The delete operation failed")
}

/// Creates a single directory. The parent must exist.
///
/// `mode` is applied on unix (before the umask) and ignored elsewhere.
#[instrument(skip_all, fields(path = %path.as_ref().display(), mode = %format!("{:o}", mode)))]
pub fn create_directory(path: impl AsRef<Path>, mode: u32) -> StdkitResult<()> {
    let path = path.as_ref();
    run_io(path, || dir_builder(mode, false).create(path))
        .context("The createDirectory operation failed")
}

/// Creates a directory and its missing parents. An existing directory is not an error.
#[instrument(skip_all, fields(path = %path.as_ref().display(), mode = %format!("{:o}", mode)))]
pub fn create_directories(path: impl AsRef<Path>, mode: u32) -> StdkitResult<()> {
    let path = path.as_ref();
    match run_io(path, || dir_builder(mode, true).create(path)) {
        Ok(()) => Ok(()),
        Err(_) if path.is_dir() => {
            debug!("directory already present");
            Ok(())
        }
        Err(err) => Err(Box::new(err.context("The createDirectories operation failed"))),
    }
}

fn dir_builder(mode: u32, recursive: bool) -> DirBuilder {
    let mut builder = DirBuilder::new();
    builder.recursive(recursive);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder
}

/// Whether anything exists at `path`. Fails when existence cannot be determined.
pub fn exists(path: impl AsRef<Path>) -> StdkitResult<bool> {
    let path = path.as_ref();
    run_io(path, || path.try_exists()).context("The exists operation failed")
}

pub fn is_file(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_file()
}

pub fn is_directory(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_dir()
}

pub fn is_symbolic_link(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_symlink()
}

/// Creates `link` pointing at `target`.
#[instrument(skip_all, fields(link = %link.as_ref().display(), target = %target.as_ref().display()))]
pub fn create_symbolic_link(link: impl AsRef<Path>, target: impl AsRef<Path>) -> StdkitResult<()> {
    let (link, target) = (link.as_ref(), target.as_ref());
    run_io(link, || symlink(target, link)).context("The createSymbolicLink operation failed")
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

/// Creates a hard link `link` to the existing file `target`.
#[instrument(skip_all, fields(link = %link.as_ref().display(), target = %target.as_ref().display()))]
pub fn create_link(link: impl AsRef<Path>, target: impl AsRef<Path>) -> StdkitResult<()> {
    let (link, target) = (link.as_ref(), target.as_ref());
    run_io(link, || fs::hard_link(target, link)).context("The createLink operation failed")
}

pub fn read_symbolic_link(path: impl AsRef<Path>) -> StdkitResult<PathBuf> {
    let path = path.as_ref();
    run_io(path, || fs::read_link(path)).context("The readSymbolicLink operation failed")
}

/// Canonical absolute form of `path`. The path must exist.
pub fn real_path(path: impl AsRef<Path>) -> StdkitResult<PathBuf> {
    let path = path.as_ref();
    run_io(path, || fs::canonicalize(path))
        .context("The getRealPath operation failed, probably because the path does not exist")
}

/// Writes `data` to `path`, creating the file if needed. Returns the number of bytes written.
#[instrument(skip_all, fields(path = %path.as_ref().display(), len = data.as_ref().len(), ?options))]
pub fn write(path: impl AsRef<Path>, data: impl AsRef<[u8]>, options: WriteOptions) -> StdkitResult<usize> {
    let (path, data) = (path.as_ref(), data.as_ref());
    run_io(path, || {
        let mut file = open_for_write(path, options)?;
        file.write_all(data)?;
        Ok(data.len())
    })
    .context("The write operation failed")
}

/// Streams everything from `reader` into `path`. Returns the number of bytes written.
#[instrument(skip_all, fields(path = %path.as_ref().display(), ?options))]
pub fn write_from_reader(
    path: impl AsRef<Path>,
    reader: &mut impl Read,
    options: WriteOptions,
) -> StdkitResult<u64> {
    let path = path.as_ref();
    run_io(path, || {
        let mut file = open_for_write(path, options)?;
        io::copy(reader, &mut file)
    })
    .context("The write operation failed")
}

/* 📖 # Why truncate after locking instead of at open?

Opening with `truncate(true)` empties the file before the lock is held, so a reader
holding the lock could observe the file half-replaced. Truncating once the lock
is ours keeps replacement atomic with respect to other lock holders.
*/
fn open_for_write(path: &Path, options: WriteOptions) -> io::Result<File> {
    let mut open_options = OpenOptions::new();
    open_options.create(true);
    if options.append {
        open_options.append(true);
    } else {
        open_options.write(true).truncate(!options.lock);
    }
    let file = open_options.open(path)?;
    if options.lock {
        file.lock()?;
        if !options.append {
            file.set_len(0)?;
        }
    }
    Ok(file)
}

/// Reads `path` starting at `offset`, at most `max_length` bytes.
///
/// A negative offset counts from the end of the file.
#[instrument(skip_all, fields(path = %path.as_ref().display(), offset = offset, ?max_length))]
pub fn read(path: impl AsRef<Path>, offset: i64, max_length: Option<u64>) -> StdkitResult<Vec<u8>> {
    let path = path.as_ref();
    run_io(path, || {
        let mut file = File::open(path)?;
        if offset > 0 {
            file.seek(SeekFrom::Start(offset.unsigned_abs()))?;
        } else if offset < 0 {
            file.seek(SeekFrom::End(offset))?;
        }
        let mut data = Vec::new();
        match max_length {
            Some(max_length) => file.take(max_length).read_to_end(&mut data)?,
            None => file.read_to_end(&mut data)?,
        };
        Ok(data)
    })
    .context("The read operation failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use stdkit_base::ErrorKind;
    use tempfile::TempDir;

    fn setup() -> TempDir {
        TempDir::new().unwrap()
    }

    #[test]
    fn test_write_and_read() {
        let dir = setup();
        let path = dir.path().join("file.txt");
        assert_eq!(write(&path, "Hello", WriteOptions::default()).unwrap(), 5);
        assert_eq!(read(&path, 0, None).unwrap(), b"Hello");
    }

    #[test]
    fn test_write_replaces_or_appends() {
        let dir = setup();
        let path = dir.path().join("file.txt");
        write(&path, "first", WriteOptions::default()).unwrap();
        write(&path, "second", WriteOptions::default()).unwrap();
        assert_eq!(read(&path, 0, None).unwrap(), b"second");
        let append = WriteOptions { append: true, lock: false };
        write(&path, "+more", append).unwrap();
        assert_eq!(read(&path, 0, None).unwrap(), b"second+more");
    }

    #[test]
    fn test_write_with_lock_replaces_contents() {
        let dir = setup();
        let path = dir.path().join("locked.txt");
        write(&path, "a long first version", WriteOptions::default()).unwrap();
        let locked = WriteOptions { append: false, lock: true };
        write(&path, "short", locked).unwrap();
        assert_eq!(read(&path, 0, None).unwrap(), b"short");
    }

    #[test]
    fn test_write_from_reader() {
        let dir = setup();
        let path = dir.path().join("copy.txt");
        let mut source = io::Cursor::new(b"streamed".to_vec());
        let written = write_from_reader(&path, &mut source, WriteOptions::default()).unwrap();
        assert_eq!(written, 8);
        assert_eq!(read(&path, 0, None).unwrap(), b"streamed");
    }

    #[test]
    fn test_read_with_offset_and_length() {
        let dir = setup();
        let path = dir.path().join("digits.txt");
        write(&path, "0123456789", WriteOptions::default()).unwrap();
        assert_eq!(read(&path, 3, None).unwrap(), b"3456789");
        assert_eq!(read(&path, 3, Some(4)).unwrap(), b"3456");
        assert_eq!(read(&path, -3, None).unwrap(), b"789");
        assert_eq!(read(&path, -5, Some(2)).unwrap(), b"56");
    }

    #[test]
    fn test_read_missing_file_is_file_error() {
        let dir = setup();
        let path = dir.path().join("missing.txt");
        let err = read(&path, 0, None).unwrap_err();
        match err.kind() {
            ErrorKind::FileError { path: p, source } => {
                assert_eq!(p, &path);
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("Expected FileError, got {:?}", other),
        }
        assert_eq!(err.get_context(), ["The read operation failed"]);
    }

    #[test]
    fn test_copy_and_move() {
        let dir = setup();
        let source = dir.path().join("a.txt");
        let copied = dir.path().join("b.txt");
        let moved = dir.path().join("c.txt");
        write(&source, "data", WriteOptions::default()).unwrap();
        copy(&source, &copied).unwrap();
        move_path(&copied, &moved).unwrap();
        assert!(is_file(&source));
        assert!(!exists(&copied).unwrap());
        assert_eq!(read(&moved, 0, None).unwrap(), b"data");
    }

    #[test]
    fn test_copy_missing_source_fails() {
        let dir = setup();
        let err = copy(dir.path().join("nope"), dir.path().join("dest")).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::FileError { .. }));
    }

    #[test]
    fn test_directories() {
        let dir = setup();
        let nested = dir.path().join("a/b/c");
        assert!(create_directory(&nested, 0o777).is_err());
        create_directories(&nested, 0o777).unwrap();
        create_directories(&nested, 0o777).unwrap();
        assert!(is_directory(&nested));
        let single = dir.path().join("single");
        create_directory(&single, 0o755).unwrap();
        assert!(create_directory(&single, 0o755).is_err());
    }

    #[test]
    fn test_create_directories_over_file_fails() {
        let dir = setup();
        let path = dir.path().join("file");
        write(&path, "x", WriteOptions::default()).unwrap();
        assert!(create_directories(&path, 0o777).is_err());
    }

    #[test]
    fn test_delete_file_and_empty_directory() {
        let dir = setup();
        let file = dir.path().join("file");
        let sub = dir.path().join("sub");
        write(&file, "x", WriteOptions::default()).unwrap();
        create_directory(&sub, 0o777).unwrap();
        delete(&file).unwrap();
        delete(&sub).unwrap();
        assert!(!exists(&file).unwrap());
        assert!(!exists(&sub).unwrap());
        assert!(delete(&file).is_err());
    }

    #[test]
    fn test_delete_non_empty_directory_fails() {
        let dir = setup();
        let sub = dir.path().join("sub");
        create_directory(&sub, 0o777).unwrap();
        write(sub.join("inner"), "x", WriteOptions::default()).unwrap();
        let err = delete(&sub).unwrap_err();
        assert_eq!(err.get_context(), ["The delete operation failed"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symbolic_links() {
        let dir = setup();
        let target = dir.path().join("target.txt");
        let link = dir.path().join("link.txt");
        write(&target, "linked", WriteOptions::default()).unwrap();
        create_symbolic_link(&link, &target).unwrap();
        assert!(is_symbolic_link(&link));
        assert!(!is_symbolic_link(&target));
        assert_eq!(read_symbolic_link(&link).unwrap(), target);
        assert_eq!(real_path(&link).unwrap(), real_path(&target).unwrap());
        delete(&link).unwrap();
        assert!(is_file(&target));
        assert!(read_symbolic_link(&target).is_err());
    }

    #[test]
    fn test_hard_link() {
        let dir = setup();
        let target = dir.path().join("target.txt");
        let link = dir.path().join("hard.txt");
        write(&target, "shared", WriteOptions::default()).unwrap();
        create_link(&link, &target).unwrap();
        write(&target, "changed", WriteOptions::default()).unwrap();
        assert_eq!(read(&link, 0, None).unwrap(), b"changed");
    }

    #[test]
    fn test_real_path_of_missing_path_fails() {
        let dir = setup();
        assert!(real_path(dir.path().join("nowhere")).is_err());
    }
}
