//! The font codec seen by the converter: TrueType bytes in, WOFF2 bytes out.

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info_span};
use ttf2woff2::BrotliQuality;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The input was rejected as malformed or unsupported
    #[error("{reason}")]
    Encode { reason: String },
}

impl CodecError {
    pub fn encode<S: ToString>(str: S) -> Self {
        Self::Encode { reason: str.to_string() }
    }
}

/// A whole-buffer font compressor.
///
/// Any `Fn(&[u8]) -> Result<Bytes, CodecError>` closure is a codec as well, which keeps test
/// doubles and ad-hoc codecs short.
pub trait FontCodec: Send + Sync {
    fn encode(&self, ttf: &[u8]) -> Result<Bytes, CodecError>;
}

impl<F> FontCodec for F
where
    F: Fn(&[u8]) -> Result<Bytes, CodecError> + Send + Sync,
{
    fn encode(&self, ttf: &[u8]) -> Result<Bytes, CodecError> {
        self(ttf)
    }
}

/// The default codec, backed by the `ttf2woff2` crate with its default brotli quality.
#[derive(Debug, Default, Copy, Clone)]
pub struct Woff2Codec;

impl FontCodec for Woff2Codec {
    fn encode(&self, ttf: &[u8]) -> Result<Bytes, CodecError> {
        let _span = info_span!("woff2_encode", size = ttf.len()).entered();
        let woff2 = ttf2woff2::encode(ttf, BrotliQuality::default()).map_err(|e| CodecError::encode(e.to_string()))?;
        debug!(input = ttf.len(), output = woff2.len(), "encoded woff2");
        Ok(Bytes::from(woff2))
    }
}
