//! Request type definitions
//!
//! Defines the identity of a map on the service and the optional parameters
//! layered on top of it when a generation is requested.

use serde::Serialize;
use std::fmt;

use crate::{Error, Result};

/// Smallest seed accepted by the service
pub const MIN_MAP_SEED: u32 = 0;
/// Largest seed accepted by the service
pub const MAX_MAP_SEED: u32 = 2_147_483_645;
/// Smallest map size accepted by the service
pub const MIN_MAP_SIZE: u32 = 1000;
/// Largest map size accepted by the service
pub const MAX_MAP_SIZE: u32 = 6000;

/// Seed, size and map pool that identify one map on the service
///
/// Fields are private: an identity is validated once and never mutated.
/// Use [`MapIdentity::with_staging`] to derive an identity in the other pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MapIdentity {
    seed: u32,
    size: u32,
    staging: bool,
}

impl MapIdentity {
    /// Identity of a production map
    pub fn new(seed: u32, size: u32) -> Result<Self> {
        Self::build(seed, size, false)
    }

    /// Identity of a map in the staging pool
    pub fn staging(seed: u32, size: u32) -> Result<Self> {
        Self::build(seed, size, true)
    }

    fn build(seed: u32, size: u32, staging: bool) -> Result<Self> {
        if !(MIN_MAP_SEED..=MAX_MAP_SEED).contains(&seed) {
            return Err(Error::validation_with_value(
                "seed",
                format!("out of range [{}:{}]", MIN_MAP_SEED, MAX_MAP_SEED),
                seed,
            ));
        }
        if !(MIN_MAP_SIZE..=MAX_MAP_SIZE).contains(&size) {
            return Err(Error::validation_with_value(
                "size",
                format!("out of range [{}:{}]", MIN_MAP_SIZE, MAX_MAP_SIZE),
                size,
            ));
        }
        Ok(Self {
            seed,
            size,
            staging,
        })
    }

    /// Same seed and size in the given pool
    pub fn with_staging(self, staging: bool) -> Self {
        Self { staging, ..self }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_staging(&self) -> bool {
        self.staging
    }

    /// Resource path of the map, relative to the API base URL
    pub fn path(&self) -> String {
        format!("/maps/{}/{}", self.seed, self.size)
    }
}

impl fmt::Display for MapIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "map {}/{}", self.seed, self.size)?;
        if self.staging {
            f.write_str(" (staging)")?;
        }
        Ok(())
    }
}

/// Image format of the rendered map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFileType {
    Png,
    Jpg,
    Webp,
}

impl ImageFileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFileType::Png => "png",
            ImageFileType::Jpg => "jpg",
            ImageFileType::Webp => "webp",
        }
    }
}

impl std::str::FromStr for ImageFileType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFileType::Png),
            "jpg" | "jpeg" => Ok(ImageFileType::Jpg),
            "webp" => Ok(ImageFileType::Webp),
            other => Err(Error::validation_with_value(
                "file_type",
                "expected one of png, jpg, webp",
                other,
            )),
        }
    }
}

/// Parameters of a generation request
///
/// Every optional field left as `None` is omitted from the request so that
/// the service default applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequestParams {
    /// Map to generate
    pub identity: MapIdentity,

    /// Image format of the rendered map
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<ImageFileType>,

    /// Custom monument-marker filter preset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_id: Option<String>,

    /// Include custom-map data in the result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_map: Option<bool>,

    /// Generate a barren map
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barren: Option<bool>,

    /// URL the service POSTs to once generation is finished
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

impl GenerationRequestParams {
    /// Parameters with every option left at the service default
    pub fn new(identity: MapIdentity) -> Self {
        Self {
            identity,
            file_type: None,
            filter_id: None,
            custom_map: None,
            barren: None,
            callback_url: None,
        }
    }

    pub fn with_file_type(mut self, file_type: ImageFileType) -> Self {
        self.file_type = Some(file_type);
        self
    }

    pub fn with_filter_id(mut self, filter_id: impl Into<String>) -> Self {
        self.filter_id = Some(filter_id.into());
        self
    }

    pub fn with_custom_map(mut self, custom_map: bool) -> Self {
        self.custom_map = Some(custom_map);
        self
    }

    pub fn with_barren(mut self, barren: bool) -> Self {
        self.barren = Some(barren);
        self
    }

    /// Set the completion callback URL
    ///
    /// The URL is validated when the request is sent.
    pub fn with_callback_url(mut self, callback_url: impl Into<String>) -> Self {
        self.callback_url = Some(callback_url.into());
        self
    }

    /// Query parameters sent with the generation request
    pub fn query(&self) -> Result<Vec<(String, String)>> {
        let mut query = vec![(
            "staging".to_string(),
            self.identity.is_staging().to_string(),
        )];

        if let Some(barren) = self.barren {
            query.push(("barren".to_string(), barren.to_string()));
        }
        if let Some(file_type) = self.file_type {
            query.push(("filetype".to_string(), file_type.as_str().to_string()));
        }
        if let Some(filter_id) = &self.filter_id {
            if filter_id.trim().is_empty() {
                return Err(Error::validation("filter_id", "must not be empty"));
            }
            query.push(("filterId".to_string(), filter_id.clone()));
        }
        if let Some(custom_map) = self.custom_map {
            query.push(("customMap".to_string(), custom_map.to_string()));
        }
        if let Some(callback_url) = &self.callback_url {
            url::Url::parse(callback_url)?;
            query.push(("callbackUrl".to_string(), callback_url.clone()));
        }

        Ok(query)
    }
}

impl From<MapIdentity> for GenerationRequestParams {
    fn from(identity: MapIdentity) -> Self {
        Self::new(identity)
    }
}
