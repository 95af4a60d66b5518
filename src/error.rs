use thiserror::Error;

use crate::types::{EntityId, EntityKind};

/// Non-fatal bookkeeping failures reported by the entity manager.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("entity {0} is already registered")]
    DuplicateId(EntityId),
}

/// Snapshot restore failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    #[error("snapshot of a {found:?} cannot be restored into a {expected:?}")]
    KindMismatch { expected: EntityKind, found: EntityKind },
}

/// Tile grid construction failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    #[error("tile grid has no rows")]
    Empty,

    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow { row: usize, expected: usize, found: usize },

    #[error("tile size must be positive, got {0}")]
    InvalidTileSize(f32),
}

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}
