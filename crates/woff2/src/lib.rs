//! A pipeline stage converting TrueType fonts to WOFF2.
//!
//! [`Ttf2Woff2`] is a [`micro_vinyl::Transform`]: pipe a stream of
//! [`FileObject`](micro_vinyl::FileObject)s through it and every `.ttf` file comes out as a
//! `.woff2` file, whether its payload is a buffer or a stream.
//!
//! # Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use micro_vinyl::{FileObject, StageExt, fs};
//! use micro_woff2::{ConversionOptions, ttf2woff2};
//! use std::path::Path;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let font = fs::open_streaming("fonts/icons.ttf", None).await?;
//!
//! let stage = ttf2woff2(ConversionOptions::new().with_clone(true));
//! let (mut files, mut errors) = futures::stream::iter(vec![font]).through(stage);
//!
//! while let Some(file) = files.next().await {
//!     fs::write_to(file, Path::new("dist")).await?;
//! }
//! for error in errors.drain() {
//!     eprintln!("{error}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Errors
//!
//! A font buffer the codec rejects is still emitted, renamed to `.woff2` with its original
//! payload, and a [`PluginError`](micro_vinyl::PluginError) is sent on the stage's error
//! channel. A rejected font stream fails when its payload is read instead.
//!
//! # Codecs
//!
//! The default [`Woff2Codec`] uses the `ttf2woff2` crate. Any other [`FontCodec`] (including a
//! plain closure) can be plugged in with [`Ttf2Woff2::with_codec`], and [`file_transform`]
//! exposes the buffer-in, buffer-out callback for stages of your own.

mod codec;
mod options;
mod transform;

pub use codec::CodecError;
pub use codec::FontCodec;
pub use codec::Woff2Codec;
pub use options::ConversionOptions;
pub use transform::PLUGIN_NAME;
pub use transform::Ttf2Woff2;
pub use transform::file_transform;
pub use transform::ttf2woff2;
