//! Reading files into a pipeline and writing them out again.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::contents::{ContentStream, Contents};
use crate::error::ContentError;
use crate::file::FileObject;

/// Loads `path` fully into memory, producing a file in buffer mode.
pub async fn read_buffered<P: AsRef<Path>>(path: P, base: Option<&Path>) -> io::Result<FileObject> {
    let path = path.as_ref();
    let metadata = fs::metadata(path).await?;
    let file = if metadata.is_dir() {
        FileObject::directory(path)
    } else {
        let bytes = fs::read(path).await?;
        FileObject::new(path, Bytes::from(bytes))
    };
    debug!(path = %path.display(), "read file in buffer mode");
    Ok(with_base(file, base))
}

/// Opens `path` without reading it, producing a file in stream mode. The payload is read as
/// the contents are consumed downstream.
pub async fn open_streaming<P: AsRef<Path>>(path: P, base: Option<&Path>) -> io::Result<FileObject> {
    let path = path.as_ref();
    let metadata = fs::metadata(path).await?;
    let file = if metadata.is_dir() {
        FileObject::directory(path)
    } else {
        let handle = fs::File::open(path).await?;
        FileObject::new(path, ContentStream::from_reader(handle))
    };
    debug!(path = %path.display(), "opened file in stream mode");
    Ok(with_base(file, base))
}

fn target_path(file: &FileObject, dir: &Path) -> PathBuf {
    match file.base().and_then(|base| file.path().strip_prefix(base).ok()) {
        Some(relative) => dir.join(relative),
        None => dir.join(file.path().file_name().unwrap_or_default()),
    }
}

fn with_base(file: FileObject, base: Option<&Path>) -> FileObject {
    match base {
        Some(base) => file.with_base(base),
        None => file,
    }
}

/// Writes `file` below `dir` and returns the written path.
///
/// A file with a base keeps its path relative to that base, any other file is written
/// directly into `dir`. Directories are created, null files are skipped and stream contents
/// are written chunk by chunk as they are read.
pub async fn write_to(file: FileObject, dir: &Path) -> Result<Option<PathBuf>, ContentError> {
    let target = target_path(&file, dir);

    if file.is_directory() {
        fs::create_dir_all(&target).await?;
        return Ok(Some(target));
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).await?;
    }

    match file.into_contents() {
        Contents::Null => return Ok(None),
        Contents::Buffer(bytes) => fs::write(&target, &bytes).await?,
        Contents::Stream(mut stream) => {
            let mut handle = fs::File::create(&target).await?;
            while let Some(chunk) = stream.next().await {
                handle.write_all(&chunk?).await?;
            }
            handle.flush().await?;
        }
    }

    debug!(path = %target.display(), "wrote file");
    Ok(Some(target))
}
