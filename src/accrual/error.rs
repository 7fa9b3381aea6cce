use serde::Serialize;

use crate::models::Id;

/// Failures that stop a single asset's accrual update.
#[derive(Debug, thiserror::Error)]
pub enum AccrualError {
    #[error("asset {asset_id} not found")]
    NotFound { asset_id: Id },

    #[error("failed to load data for asset {asset_id}: {source:#}")]
    Lookup {
        asset_id: Id,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to persist rented days for asset {asset_id}: {source:#}")]
    PersistenceFailure {
        asset_id: Id,
        #[source]
        source: anyhow::Error,
    },

    #[error("rented days for asset {asset_id} kept changing underneath after {attempts} attempts")]
    WriteConflict { asset_id: Id, attempts: u32 },
}

/// Serializable discriminant of [`AccrualError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Lookup,
    PersistenceFailure,
    WriteConflict,
}

impl AccrualError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AccrualError::NotFound { .. } => ErrorKind::NotFound,
            AccrualError::Lookup { .. } => ErrorKind::Lookup,
            AccrualError::PersistenceFailure { .. } => ErrorKind::PersistenceFailure,
            AccrualError::WriteConflict { .. } => ErrorKind::WriteConflict,
        }
    }

    pub fn asset_id(&self) -> &Id {
        match self {
            AccrualError::NotFound { asset_id }
            | AccrualError::Lookup { asset_id, .. }
            | AccrualError::PersistenceFailure { asset_id, .. }
            | AccrualError::WriteConflict { asset_id, .. } => asset_id,
        }
    }
}
