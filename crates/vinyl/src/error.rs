use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// The origin of a [`PluginError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// the stage's codec rejected the payload
    Codec,
    /// the content stream failed before the codec could run
    Upstream,
}

/// An error raised by a pipeline stage, carrying enough context for a
/// pipeline-level handler to log it and locate the failing asset.
#[derive(Error, Debug, Clone)]
#[error("{plugin}: {message}")]
pub struct PluginError {
    plugin: Cow<'static, str>,
    kind: ErrorKind,
    message: String,
    show_stack: bool,
    file_name: Option<PathBuf>,
}

impl PluginError {
    pub fn new<P, S>(plugin: P, kind: ErrorKind, message: S) -> Self
    where
        P: Into<Cow<'static, str>>,
        S: ToString,
    {
        Self { plugin: plugin.into(), kind, message: message.to_string(), show_stack: false, file_name: None }
    }

    pub fn codec<P: Into<Cow<'static, str>>, S: ToString>(plugin: P, message: S) -> Self {
        Self::new(plugin, ErrorKind::Codec, message)
    }

    pub fn upstream<P: Into<Cow<'static, str>>, S: ToString>(plugin: P, message: S) -> Self {
        Self::new(plugin, ErrorKind::Upstream, message)
    }

    /// Requests that the handler prints a full diagnostic trace.
    #[must_use]
    pub fn with_show_stack(mut self, show_stack: bool) -> Self {
        self.show_stack = show_stack;
        self
    }

    /// Attaches the path of the asset being processed when the error occurred.
    #[must_use]
    pub fn with_file_name<P: Into<PathBuf>>(mut self, file_name: P) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn show_stack(&self) -> bool {
        self.show_stack
    }

    pub fn file_name(&self) -> Option<&Path> {
        self.file_name.as_deref()
    }
}

/// Errors surfaced while reading a [`ContentStream`](crate::ContentStream).
///
/// The type is `Clone` so a tee can hand the same failure to both of its branches.
#[derive(Error, Debug, Clone)]
pub enum ContentError {
    #[error("io error: {source}")]
    Io { source: Arc<io::Error> },

    #[error(transparent)]
    Plugin {
        #[from]
        source: PluginError,
    },
}

impl ContentError {
    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: Arc::new(e.into()) }
    }

    /// Returns the plugin error if this failure was raised by a stage.
    pub fn as_plugin_error(&self) -> Option<&PluginError> {
        match self {
            ContentError::Plugin { source } => Some(source),
            ContentError::Io { .. } => None,
        }
    }
}

impl From<io::Error> for ContentError {
    fn from(e: io::Error) -> Self {
        Self::io(e)
    }
}
