//! Startup errors of the engine.
//!
//! Runtime paths never fail: out-of-bounds reads yield air, duplicate
//! generation requests are no-ops and damage on air is ignored. Only building
//! an [`EngineState`](super::EngineState) can fail.

use std::fmt;

use super::config::ConfigError;
use super::voxels::block::RegistryError;
use super::voxels::chunk::ChunkCodecError;

#[derive(Debug)]
pub enum EngineError {
    Config(ConfigError),
    Registry(RegistryError),
    Codec(ChunkCodecError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => err.fmt(f),
            Self::Registry(err) => err.fmt(f),
            Self::Codec(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Registry(err) => Some(err),
            Self::Codec(err) => Some(err),
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<RegistryError> for EngineError {
    fn from(err: RegistryError) -> Self {
        Self::Registry(err)
    }
}

impl From<ChunkCodecError> for EngineError {
    fn from(err: ChunkCodecError) -> Self {
        Self::Codec(err)
    }
}
