/// Which cache a variant was written to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheChoice {
    /// The cache reserved for small images, such as thumbnails.
    Small,

    /// The main cache.
    #[default]
    Default,
}

/// Where a set of variants came from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum VariantsSource {
    /// Listed by the caller alongside the request.
    #[default]
    Request,

    /// Found in a variations index.
    Index,
}

/// What the index records about a cached variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantSummary {
    pub width: u32,
    pub height: u32,
    pub size_in_bytes: usize,
}

/// One differently-sized rendition of a logical piece of media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant<K> {
    pub key: K,
    pub width: u32,
    pub height: u32,
    pub cache_choice: CacheChoice,
}

impl<K> Variant<K> {
    /// Whether this variant is at least `width` by `height`.
    pub fn covers(&self, width: u32, height: u32) -> bool {
        self.width >= width && self.height >= height
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// The variants known for one media id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaVariations<K> {
    media_id: String,
    variants: Vec<Variant<K>>,
    source: VariantsSource,
}

impl<K> MediaVariations<K> {
    pub fn builder(media_id: impl Into<String>) -> MediaVariationsBuilder<K> {
        MediaVariationsBuilder {
            media_id: media_id.into(),
            variants: Vec::new(),
            source: VariantsSource::default(),
        }
    }

    pub fn media_id(&self) -> &str {
        &self.media_id
    }

    pub fn variants(&self) -> &[Variant<K>] {
        &self.variants
    }

    pub fn source(&self) -> VariantsSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// Builds a [`MediaVariations`]. Callers hand a builder to the index so any
/// variants they already know about are kept alongside the ones it finds.
#[derive(Debug, Clone)]
pub struct MediaVariationsBuilder<K> {
    media_id: String,
    variants: Vec<Variant<K>>,
    source: VariantsSource,
}

impl<K> MediaVariationsBuilder<K> {
    pub fn add_variant(
        mut self,
        key: K,
        width: u32,
        height: u32,
        cache_choice: CacheChoice,
    ) -> Self {
        self.variants.push(Variant {
            key,
            width,
            height,
            cache_choice,
        });
        self
    }

    pub fn source(mut self, source: VariantsSource) -> Self {
        self.source = source;
        self
    }

    pub fn media_id(&self) -> &str {
        &self.media_id
    }

    pub fn has_variant(&self, key: &K) -> bool
    where
        K: PartialEq,
    {
        self.variants.iter().any(|v| &v.key == key)
    }

    pub fn build(self) -> MediaVariations<K> {
        MediaVariations {
            media_id: self.media_id,
            variants: self.variants,
            source: self.source,
        }
    }
}
