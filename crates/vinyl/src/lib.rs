//! File objects and transform stages for asynchronous asset pipelines.
//!
//! This crate provides the host side of a build pipeline: the [`FileObject`] flowing through
//! it, the [`Transform`] contract a stage implements, and the plumbing that drives a stage over
//! a [`futures::Stream`] of files.
//!
//! # Architecture
//!
//! - [`file`]: the [`FileObject`] itself, its path history and its independent [`FileObject::fork`]
//! - [`contents`]: the three payload modes ([`Contents::Null`], [`Contents::Buffer`],
//!   [`Contents::Stream`]) and the single-owner [`ContentStream`]
//! - [`tee`]: forks a [`ContentStream`] so two consumers can read the same bytes
//! - [`buffered`]: [`BufferStream`], bridging a streamed payload to a whole-buffer transformation
//! - [`stage`]: the [`Transform`] trait, its [`Emitter`] and the [`Through`] stream driving it
//! - [`fs`]: reading files from disk in buffer or stream mode and writing them back
//!
//! # Scheduling
//!
//! Nothing in this crate spawns tasks. A stage runs when its output stream is polled, one
//! input file at a time, and streamed payloads are only read when their consumer polls them.
//! Backpressure is therefore whatever the consumer applies.
//!
//! # Error Handling
//!
//! - [`PluginError`]: raised by a stage, with the plugin name, message and failing asset
//! - [`ContentError`]: raised while reading a [`ContentStream`]
//!
//! A stage reports its errors on [`StageErrors`], separate from the files it emits. Errors
//! that belong to one streamed payload are yielded by that payload's stream instead.

pub mod buffered;
pub mod contents;
pub mod file;
pub mod fs;
pub mod stage;
pub mod tee;

mod error;

pub use buffered::BufferStream;
pub use contents::ContentStream;
pub use contents::Contents;
pub use error::ContentError;
pub use error::ErrorKind;
pub use error::PluginError;
pub use file::FileObject;
pub use stage::Emitter;
pub use stage::FileSender;
pub use stage::StageErrors;
pub use stage::StageExt;
pub use stage::Through;
pub use stage::Transform;
pub use stage::file_channel;
