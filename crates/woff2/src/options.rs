use serde::Deserialize;

/// Options of the [`Ttf2Woff2`](crate::Ttf2Woff2) stage, fixed at construction.
///
/// Both flags default to `false`. When deserialized, missing fields take their default and
/// unknown fields are ignored, so pipeline configs written for other stages can be shared.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversionOptions {
    /// Convert every non-null file, whatever its extension
    pub ignore_ext: bool,
    /// Emit the original file unchanged ahead of the converted one
    pub clone: bool,
}

impl ConversionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ignore_ext(mut self, ignore_ext: bool) -> Self {
        self.ignore_ext = ignore_ext;
        self
    }

    #[must_use]
    pub fn with_clone(mut self, clone: bool) -> Self {
        self.clone = clone;
        self
    }
}
