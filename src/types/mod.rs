//! Type definitions for the rustmaps client
//!
//! This module contains the identities, parameters and results exchanged with the service.

pub mod request;
pub mod response;

pub use request::{
    GenerationRequestParams, ImageFileType, MAX_MAP_SEED, MAX_MAP_SIZE, MIN_MAP_SEED,
    MIN_MAP_SIZE, MapIdentity,
};
pub use response::{
    FilterDescriptor, ImageMetadata, MapData, MapProgress, MapResult, MapStatus,
};
