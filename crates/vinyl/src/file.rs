use std::path::{Path, PathBuf};

use crate::contents::Contents;

/// An asset travelling through a pipeline.
///
/// A file object owns its [`Contents`] and remembers every path it had: stages renaming a
/// file go through [`FileObject::set_path`], which appends to [`FileObject::history`].
///
/// There is no `Clone` implementation, because a streamed payload cannot be shared. Use
/// [`FileObject::fork`] to get an independent copy.
#[derive(Debug)]
pub struct FileObject {
    history: Vec<PathBuf>,
    base: Option<PathBuf>,
    contents: Contents,
    directory: bool,
}

impl FileObject {
    pub fn new<P: Into<PathBuf>, C: Into<Contents>>(path: P, contents: C) -> Self {
        Self { history: vec![path.into()], base: None, contents: contents.into(), directory: false }
    }

    /// A directory entry; it never carries contents.
    pub fn directory<P: Into<PathBuf>>(path: P) -> Self {
        Self { history: vec![path.into()], base: None, contents: Contents::Null, directory: true }
    }

    /// Sets the base directory that [`FileObject::relative`] is computed against.
    #[must_use]
    pub fn with_base<P: Into<PathBuf>>(mut self, base: P) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn path(&self) -> &Path {
        // history is never empty, every constructor seeds it
        self.history.last().map_or_else(|| Path::new(""), PathBuf::as_path)
    }

    pub fn set_path<P: Into<PathBuf>>(&mut self, path: P) {
        let path = path.into();
        if path != self.path() {
            self.history.push(path);
        }
    }

    /// Every path this file had, oldest first; the last one is the current path.
    pub fn history(&self) -> &[PathBuf] {
        &self.history
    }

    pub fn base(&self) -> Option<&Path> {
        self.base.as_deref()
    }

    /// The current path relative to the base directory, or the path itself when it is not
    /// below the base.
    pub fn relative(&self) -> &Path {
        let path = self.path();
        self.base.as_deref().and_then(|base| path.strip_prefix(base).ok()).unwrap_or(path)
    }

    /// The extension of the current path including its leading dot, or an empty string.
    ///
    /// Dot files like `.ttf` have no extension.
    pub fn extname(&self) -> String {
        match self.path().extension() {
            Some(ext) => format!(".{}", ext.to_string_lossy()),
            None => String::new(),
        }
    }

    /// Replaces the extension of the current path, keeping its directory and stem. A path
    /// without extension gets `ext` appended. `ext` may be given with or without its dot.
    pub fn replace_extension(&mut self, ext: &str) {
        let path = self.path().with_extension(ext.trim_start_matches('.'));
        self.set_path(path);
    }

    pub fn contents(&self) -> &Contents {
        &self.contents
    }

    pub fn contents_mut(&mut self) -> &mut Contents {
        &mut self.contents
    }

    pub fn set_contents<C: Into<Contents>>(&mut self, contents: C) {
        self.contents = contents.into();
    }

    /// Moves the contents out, leaving [`Contents::Null`] behind.
    pub fn take_contents(&mut self) -> Contents {
        std::mem::take(&mut self.contents)
    }

    pub fn into_contents(self) -> Contents {
        self.contents
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.contents.is_null()
    }

    #[inline]
    pub fn is_buffer(&self) -> bool {
        self.contents.is_buffer()
    }

    #[inline]
    pub fn is_stream(&self) -> bool {
        self.contents.is_stream()
    }

    #[inline]
    pub fn is_directory(&self) -> bool {
        self.directory && self.contents.is_null()
    }

    /// Returns an independent copy of this file.
    ///
    /// Path, history and base are duplicated. Buffer contents are copied by value, while a
    /// stream is split with a tee so the copy and `self` each read the full payload from
    /// their own branch.
    pub fn fork(&mut self) -> FileObject {
        FileObject { history: self.history.clone(), base: self.base.clone(), contents: self.contents.fork(), directory: self.directory }
    }
}
