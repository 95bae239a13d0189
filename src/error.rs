use crate::types::{DocumentType, Role, ShipmentStatus};

pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy for the lifecycle engine.
///
/// Validation and permission failures happen before any mutation; a
/// caller receiving one can assume zero side effects. `Conflict` and
/// `StaleWrite` mean the shipment's current state refused the
/// transition. `Storage`/`Codec` are unexpected collaborator failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("permission denied: {role} may not {action}")]
    Permission { role: Role, action: &'static str },
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("operation not allowed while shipment is {current}")]
    Conflict { current: ShipmentStatus },
    #[error("shipment was modified concurrently, retry the operation")]
    StaleWrite,
    #[error("no free shipment code available, the day's code space is exhausted")]
    CodesExhausted,
    #[error("storage failure")]
    Storage(#[from] sled::Error),
    #[error("codec failure: {0}")]
    Codec(String),
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, id: &str) -> Self {
        Error::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn permission(role: Role, action: &'static str) -> Self {
        Error::Permission { role, action }
    }
}

/// Machine-readable validation detail, surfaced so callers can
/// self-correct (e.g. the list of missing document types).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("{0} must be a positive amount")]
    NonPositive(&'static str),
    #[error("pickup date must be on or before the expected delivery date")]
    DateOrdering,
    #[error("a rejection reason is required")]
    EmptyReason,
    #[error("missing mandatory documents: {0:?}")]
    MissingDocuments(Vec<DocumentType>),
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("file exceeds the maximum document size: {0} bytes")]
    FileTooLarge(u64),
}

/// Shorthand for mapping minicbor encode/decode failures into the
/// crate error without threading generic writer error types around.
pub(crate) fn codec_err(err: impl std::fmt::Display) -> Error {
    Error::Codec(err.to_string())
}
