//! Document records and the mode-specific completeness checker that
//! gates shipment approval.
use super::error::ValidationError;
use super::types::{DocumentType, TimeStamp, TransportMode};
use chrono::Utc;

pub const MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;
pub const ALLOWED_MIME_TYPES: [&str; 2] = ["application/pdf", "image/jpeg"];

/// Metadata for an uploaded document. The file bytes live on disk at
/// `storage_path`; only the metadata is persisted here.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct DocumentRecord {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub shipment_id: String,
    #[n(2)]
    pub document_type: DocumentType,
    #[n(3)]
    pub file_name: String,
    #[n(4)]
    pub storage_path: String,
    #[n(5)]
    pub size_bytes: u64,
    #[n(6)]
    pub mime_type: String,
    #[n(7)]
    pub uploaded_by: String,
    #[n(8)]
    pub uploaded_at: TimeStamp<Utc>,
}

/// Upload request as it arrives from the transport layer, validated
/// before a [`DocumentRecord`] is minted.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub document_type: DocumentType,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub storage_path: String,
}

impl DocumentUpload {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.file_name.trim().is_empty() {
            return Err(ValidationError::MissingField("file_name"));
        }
        if self.storage_path.trim().is_empty() {
            return Err(ValidationError::MissingField("storage_path"));
        }
        if !ALLOWED_MIME_TYPES.contains(&self.mime_type.as_str()) {
            return Err(ValidationError::UnsupportedFileType(self.mime_type.clone()));
        }
        if self.size_bytes == 0 {
            return Err(ValidationError::NonPositive("size_bytes"));
        }
        if self.size_bytes > MAX_DOCUMENT_BYTES {
            return Err(ValidationError::FileTooLarge(self.size_bytes));
        }
        Ok(())
    }
}

/// Mandatory document types per transport mode. Every mode requires an
/// invoice and a packing list; sea adds a bill of lading, air adds an
/// air waybill, road adds nothing.
pub fn required_documents(mode: TransportMode) -> &'static [DocumentType] {
    match mode {
        TransportMode::Sea => &[
            DocumentType::Invoice,
            DocumentType::PackingList,
            DocumentType::BillOfLading,
        ],
        TransportMode::Air => &[
            DocumentType::Invoice,
            DocumentType::PackingList,
            DocumentType::AirWaybill,
        ],
        TransportMode::Road => &[DocumentType::Invoice, DocumentType::PackingList],
    }
}

/// Outcome of a completeness check, with the missing types surfaced so
/// the caller can self-correct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completeness {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub missing_documents: Vec<DocumentType>,
}

/// Pure completeness check: existence-based, duplicates are fine, and
/// calling it twice with the same inputs returns the same answer.
pub fn check_completeness(present: &[DocumentType], mode: TransportMode) -> Completeness {
    let mut missing = Vec::new();
    let mut errors = Vec::new();

    for required in required_documents(mode) {
        if !present.contains(required) {
            missing.push(*required);
            errors.push(format!("missing mandatory document: {required}"));
        }
    }

    Completeness {
        is_valid: missing.is_empty(),
        errors,
        missing_documents: missing,
    }
}
