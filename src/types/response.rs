//! Response type definitions
//!
//! Wire shapes returned by the service and the domain values built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::MapIdentity;

/// Generation status of a map, as observed by one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapStatus {
    /// Accepted and queued (the service's staging step)
    Pending,
    /// Being rendered
    Generating,
    /// Finished, results available
    Completed,
    /// Generation failed server-side
    Failed,
    /// Unknown to the service
    NotFound,
}

impl MapStatus {
    /// Completed and Failed end a poll session
    pub fn is_terminal(&self) -> bool {
        matches!(self, MapStatus::Completed | MapStatus::Failed)
    }

    /// Parse a state name reported in an in-progress body
    ///
    /// Returns `None` for names the service has not been seen to use.
    pub fn from_state_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "staging" | "pending" | "queued" => Some(MapStatus::Pending),
            "generating" | "rendering" | "processing" | "uploading" => {
                Some(MapStatus::Generating)
            }
            "completed" | "complete" | "done" => Some(MapStatus::Completed),
            "failed" | "error" => Some(MapStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for MapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MapStatus::Pending => "pending",
            MapStatus::Generating => "generating",
            MapStatus::Completed => "completed",
            MapStatus::Failed => "failed",
            MapStatus::NotFound => "not_found",
        };
        f.write_str(name)
    }
}

/// Body of a 200 response describing a generated map
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "MapDataWire")]
pub struct MapData {
    /// Map UUID
    pub id: String,
    pub seed: Option<u32>,
    pub size: Option<u32>,
    pub is_staging: Option<bool>,
    /// Map page on rustmaps.com
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub image_icon_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub download_url: Option<String>,
    pub image_width: Option<u32>,
    pub image_height: Option<u32>,
    pub total_monuments: Option<u32>,
    pub monuments: Vec<serde_json::Value>,
    pub generated_at: Option<DateTime<Utc>>,
}

/// Map body as sent; the service names some fields in more than one way
/// and may send both spellings at once
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapDataWire {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    map_id: Option<String>,
    #[serde(default)]
    seed: Option<u32>,
    #[serde(default)]
    size: Option<u32>,
    #[serde(default)]
    is_staging: Option<bool>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    image_icon_url: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    image_width: Option<u32>,
    #[serde(default)]
    image_height: Option<u32>,
    #[serde(default)]
    total_monuments: Option<u32>,
    #[serde(default)]
    monuments: Vec<serde_json::Value>,
    #[serde(default)]
    generated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<MapDataWire> for MapData {
    type Error = String;

    fn try_from(wire: MapDataWire) -> Result<Self, Self::Error> {
        let id = wire
            .id
            .or(wire.map_id)
            .ok_or_else(|| "missing field `id`".to_string())?;

        Ok(Self {
            id,
            seed: wire.seed,
            size: wire.size,
            is_staging: wire.is_staging,
            url: wire.url,
            image_url: wire.image_url,
            image_icon_url: wire.image_icon_url,
            thumbnail_url: wire.thumbnail_url,
            download_url: wire.download_url,
            image_width: wire.image_width,
            image_height: wire.image_height,
            total_monuments: wire.total_monuments,
            monuments: wire.monuments,
            generated_at: wire.generated_at.or(wire.created_at),
        })
    }
}

impl MapData {
    /// Build the domain result for a known identity
    pub fn into_result(self, identity: MapIdentity) -> MapResult {
        let monument_count = self
            .total_monuments
            .unwrap_or(self.monuments.len() as u32);

        MapResult {
            identity,
            map_id: self.id,
            url: self.url,
            image_url: self.image_url,
            image_icon_url: self.image_icon_url,
            thumbnail_url: self.thumbnail_url,
            download_url: self.download_url,
            image: ImageMetadata {
                width: self.image_width,
                height: self.image_height,
                monument_count,
            },
            generated_at: self.generated_at,
        }
    }
}

/// Body of a 409 response or a generation acknowledgement
///
/// Every field is optional: the service has been seen to return bare
/// `{"mapId": ...}` objects as well as objects with a state.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "MapProgressWire")]
pub struct MapProgress {
    pub map_id: Option<String>,
    pub state: Option<String>,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapProgressWire {
    #[serde(default)]
    map_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    current_state: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

impl From<MapProgressWire> for MapProgress {
    fn from(wire: MapProgressWire) -> Self {
        Self {
            map_id: wire.map_id.or(wire.id),
            state: wire.state.or(wire.current_state).or(wire.status),
            reason: wire.reason,
        }
    }
}

impl MapProgress {
    /// Status implied by the body, defaulting to `default` when no state is given
    pub fn status_or(&self, default: MapStatus) -> MapStatus {
        self.state
            .as_deref()
            .and_then(MapStatus::from_state_name)
            .unwrap_or(default)
    }
}

/// Rendered image metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageMetadata {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub monument_count: u32,
}

/// A completed map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapResult {
    /// Map this result belongs to
    pub identity: MapIdentity,
    /// Map UUID assigned by the service
    pub map_id: String,
    /// Map page on rustmaps.com
    pub url: Option<String>,
    /// Full-size image
    pub image_url: Option<String>,
    /// Image with monument icons
    pub image_icon_url: Option<String>,
    pub thumbnail_url: Option<String>,
    /// Download link for the map file, when the service offers one
    pub download_url: Option<String>,
    pub image: ImageMetadata,
    /// When the service finished generating the map
    pub generated_at: Option<DateTime<Utc>>,
}

/// A monument-filter preset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Monuments the preset marks on the map
    #[serde(default)]
    pub monuments: Vec<String>,
}
