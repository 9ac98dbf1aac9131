use std::fmt;

/// Requested decode dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResizeOptions {
    pub width: u32,
    pub height: u32,
}

/// Names one cacheable image: the source it was loaded from, plus the size
/// it was decoded at, if any.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageCacheKey {
    uri: String,
    resize: Option<ResizeOptions>,
}

impl ImageCacheKey {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            resize: None,
        }
    }

    pub fn resized(uri: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            uri: uri.into(),
            resize: Some(ResizeOptions { width, height }),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn resize(&self) -> Option<ResizeOptions> {
        self.resize
    }

    /// Whether this key was derived from `uri`, at any size.
    pub fn matches_uri(&self, uri: &str) -> bool {
        self.uri == uri
    }
}

impl fmt::Display for ImageCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.resize {
            Some(ResizeOptions { width, height }) => write!(f, "{}@{}x{}", self.uri, width, height),
            None => f.write_str(&self.uri),
        }
    }
}
