//! Service layer for the shipment approval workflow.
//!
//! Every operation follows the same shape: role gate, load, precondition
//! checks, persist, then best-effort audit and notification. Gates and
//! validation run before any mutation, so a failed call has no side
//! effects. Status mutations go through compare-and-swap on the record
//! bytes that were read, turning concurrent writers into a conflict
//! instead of a lost update.
use super::audit::{AuditEntry, AuditFilter, AuditLog};
use super::documents::{Completeness, DocumentRecord, DocumentUpload, check_completeness};
use super::error::{Error, Result, ValidationError, codec_err};
use super::notify::{Notification, Notifier};
use super::shipment::{ShipmentDetails, ShipmentRecord};
use super::types::{Action, Actor, Role, ShipmentStatus, TransportMode};
use super::utils;
use std::sync::Arc;

const SHIPMENTS_TREE: &str = "shipments";
const CODES_TREE: &str = "shipment_codes";
const DOCUMENTS_TREE: &str = "documents";
const SHIPMENT_DOCS_TREE: &str = "shipment_documents";

/// Draws allowed when claiming a shipment code before giving up.
const MAX_CODE_DRAWS: usize = 512;

/// Pagination request for listing endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
        }
    }
}

/// One page of shipments plus the metadata the caller needs to page on.
#[derive(Debug, Clone)]
pub struct ShipmentPage {
    pub items: Vec<ShipmentRecord>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub pages: usize,
}

pub struct ShipmentService {
    shipments: sled::Tree,
    codes: sled::Tree,
    documents: sled::Tree,
    shipment_docs: sled::Tree,
    audit: AuditLog,
    notifier: Arc<dyn Notifier>,
}

impl ShipmentService {
    /// All collaborators are injected here; nothing reaches for ambient
    /// state. One instance is constructed at process start and shared.
    pub fn new(db: Arc<sled::Db>, notifier: Arc<dyn Notifier>) -> Result<Self> {
        Ok(Self {
            shipments: db.open_tree(SHIPMENTS_TREE)?,
            codes: db.open_tree(CODES_TREE)?,
            documents: db.open_tree(DOCUMENTS_TREE)?,
            shipment_docs: db.open_tree(SHIPMENT_DOCS_TREE)?,
            audit: AuditLog::open(&db)?,
            notifier,
        })
    }

    /// Create a new shipment in `created` status. Clearance managers
    /// (and admin) only; the draft must pass full validation before
    /// anything is written.
    pub fn create_shipment(
        &self,
        actor: &Actor,
        details: ShipmentDetails,
    ) -> Result<ShipmentRecord> {
        if !actor.role.may(Action::CreateShipment) {
            return Err(Error::permission(actor.role, "create shipments"));
        }
        let details = details.validate_and_finalise()?;

        let id = utils::new_uuid_to_bech32("shp").map_err(codec_err)?;
        let code = self.claim_unique_code(&id)?;

        let record = ShipmentRecord::new(id, code, actor.user_id.clone(), details);
        let encoded = minicbor::to_vec(&record).map_err(codec_err)?;
        self.shipments.insert(record.id.as_bytes(), encoded)?;

        self.audit.append(
            actor,
            "shipment.created",
            "shipment",
            &record.id,
            Some(record.code.clone()),
        );
        self.notifier.notify(&Notification::ShipmentCreated {
            code: record.code.clone(),
            created_by: record.created_by.clone(),
        });

        Ok(record)
    }

    /// A shipment and its attached documents. Clearance managers can
    /// only reach their own shipments; anything else reads as not found
    /// rather than leaking that the id exists.
    pub fn get_shipment(
        &self,
        actor: &Actor,
        shipment_id: &str,
    ) -> Result<(ShipmentRecord, Vec<DocumentRecord>)> {
        let (record, _) = self.load_shipment(shipment_id)?;
        self.ensure_visible(actor, &record)?;
        let documents = self.documents_for(shipment_id)?;
        Ok((record, documents))
    }

    /// Role-filtered listing: admin and accounts see everything, a
    /// clearance manager sees exactly their own shipments. Newest first.
    pub fn list_shipments(&self, actor: &Actor, page: Page) -> Result<ShipmentPage> {
        let limit = page.limit.clamp(1, 100);

        let mut visible = Vec::new();
        for item in self.shipments.iter() {
            let (_, value) = item?;
            let record: ShipmentRecord = minicbor::decode(&value).map_err(codec_err)?;
            if actor.role.may(Action::ViewAll) || record.created_by == actor.user_id {
                visible.push(record);
            }
        }
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = visible.len();
        let items = visible
            .into_iter()
            .skip(page.offset)
            .take(limit)
            .collect();

        Ok(ShipmentPage {
            items,
            total,
            limit,
            offset: page.offset,
            pages: total.div_ceil(limit),
        })
    }

    /// Edit the business payload. Only the creator (or admin) may edit,
    /// and only while the status still permits it. A successful edit
    /// clears any stale rejection reason.
    pub fn update_shipment(
        &self,
        actor: &Actor,
        shipment_id: &str,
        details: ShipmentDetails,
    ) -> Result<ShipmentRecord> {
        if !actor.role.may(Action::UpdateShipment) {
            return Err(Error::permission(actor.role, "edit shipments"));
        }
        let (mut record, old) = self.load_shipment(shipment_id)?;
        self.ensure_visible(actor, &record)?;
        if actor.role != Role::Admin && record.created_by != actor.user_id {
            return Err(Error::permission(actor.role, "edit this shipment"));
        }
        if !record.status.is_editable() {
            return Err(Error::Conflict {
                current: record.status,
            });
        }
        let details = details.validate_and_finalise()?;

        record.details = details;
        record.rejection_reason = None;
        record.touch(&actor.user_id);
        self.store_cas(&old, &record)?;

        self.audit.append(
            actor,
            "shipment.updated",
            "shipment",
            &record.id,
            Some(record.code.clone()),
        );

        Ok(record)
    }

    /// Approve a shipment. Accounts (or admin) only, legal only from
    /// `created`/`changes_requested`, and refused with the missing
    /// document list while the completeness gate does not hold.
    pub fn approve(&self, actor: &Actor, shipment_id: &str) -> Result<ShipmentRecord> {
        if !actor.role.may(Action::Approve) {
            return Err(Error::permission(actor.role, "approve shipments"));
        }
        let (mut record, old) = self.load_shipment(shipment_id)?;
        if !record.status.is_reviewable() {
            return Err(Error::Conflict {
                current: record.status,
            });
        }

        // Completeness is evaluated live against the attached documents,
        // never against a stored flag, so it cannot go stale.
        let mode = self.transport_mode(&record)?;
        let present = self.document_types_for(shipment_id)?;
        let completeness = check_completeness(&present, mode);
        if !completeness.is_valid {
            return Err(ValidationError::MissingDocuments(completeness.missing_documents).into());
        }

        record.status = ShipmentStatus::Approved;
        record.touch(&actor.user_id);
        self.store_cas(&old, &record)?;

        self.audit.append(
            actor,
            "shipment.approved",
            "shipment",
            &record.id,
            Some(record.code.clone()),
        );
        self.notifier.notify(&Notification::ShipmentApproved {
            code: record.code.clone(),
            creator: record.created_by.clone(),
            approved_by: actor.user_id.clone(),
        });

        Ok(record)
    }

    /// Reject a shipment with a mandatory, non-empty reason. The reason
    /// is persisted verbatim.
    pub fn reject(&self, actor: &Actor, shipment_id: &str, reason: &str) -> Result<ShipmentRecord> {
        if !actor.role.may(Action::Reject) {
            return Err(Error::permission(actor.role, "reject shipments"));
        }
        if reason.trim().is_empty() {
            return Err(ValidationError::EmptyReason.into());
        }
        let (mut record, old) = self.load_shipment(shipment_id)?;
        if !record.status.is_reviewable() {
            return Err(Error::Conflict {
                current: record.status,
            });
        }

        record.status = ShipmentStatus::Rejected;
        record.rejection_reason = Some(reason.to_string());
        record.touch(&actor.user_id);
        self.store_cas(&old, &record)?;

        self.audit.append(
            actor,
            "shipment.rejected",
            "shipment",
            &record.id,
            Some(reason.to_string()),
        );
        self.notifier.notify(&Notification::ShipmentRejected {
            code: record.code.clone(),
            creator: record.created_by.clone(),
            reason: reason.to_string(),
        });

        Ok(record)
    }

    /// Send a shipment back to its creator for changes, with an
    /// optional message for context.
    pub fn request_changes(
        &self,
        actor: &Actor,
        shipment_id: &str,
        message: Option<String>,
    ) -> Result<ShipmentRecord> {
        if !actor.role.may(Action::RequestChanges) {
            return Err(Error::permission(actor.role, "request changes"));
        }
        let (mut record, old) = self.load_shipment(shipment_id)?;
        if !record.status.is_reviewable() {
            return Err(Error::Conflict {
                current: record.status,
            });
        }

        record.status = ShipmentStatus::ChangesRequested;
        record.rejection_reason = message.clone();
        record.touch(&actor.user_id);
        self.store_cas(&old, &record)?;

        self.audit.append(
            actor,
            "shipment.changes_requested",
            "shipment",
            &record.id,
            message.clone(),
        );
        self.notifier.notify(&Notification::ChangesRequested {
            code: record.code.clone(),
            creator: record.created_by.clone(),
            message,
        });

        Ok(record)
    }

    /// Admin-only removal; cascades to the shipment's document records
    /// and frees its human-facing code.
    pub fn delete_shipment(&self, actor: &Actor, shipment_id: &str) -> Result<()> {
        if !actor.role.may(Action::DeleteShipment) {
            return Err(Error::permission(actor.role, "delete shipments"));
        }
        let (record, _) = self.load_shipment(shipment_id)?;

        let mut doc_batch = sled::Batch::default();
        let mut index_batch = sled::Batch::default();
        for item in self.shipment_docs.scan_prefix(index_prefix(shipment_id)) {
            let (index_key, doc_id) = item?;
            doc_batch.remove(doc_id.as_ref());
            index_batch.remove(index_key);
        }
        self.documents.apply_batch(doc_batch)?;
        self.shipment_docs.apply_batch(index_batch)?;
        self.codes.remove(record.code.as_bytes())?;
        self.shipments.remove(record.id.as_bytes())?;

        self.audit.append(
            actor,
            "shipment.deleted",
            "shipment",
            &record.id,
            Some(record.code),
        );

        Ok(())
    }

    /// Attach a document to an existing shipment. Creator or admin; the
    /// upload metadata must pass type and size validation.
    pub fn attach_document(
        &self,
        actor: &Actor,
        shipment_id: &str,
        upload: DocumentUpload,
    ) -> Result<DocumentRecord> {
        if !actor.role.may(Action::UploadDocument) {
            return Err(Error::permission(actor.role, "upload documents"));
        }
        let (shipment, _) = self.load_shipment(shipment_id)?;
        self.ensure_visible(actor, &shipment)?;
        if actor.role != Role::Admin && shipment.created_by != actor.user_id {
            return Err(Error::permission(actor.role, "upload documents to this shipment"));
        }
        upload.validate()?;

        let record = DocumentRecord {
            id: utils::new_uuid_to_bech32("doc").map_err(codec_err)?,
            shipment_id: shipment.id.clone(),
            document_type: upload.document_type,
            file_name: upload.file_name,
            storage_path: upload.storage_path,
            size_bytes: upload.size_bytes,
            mime_type: upload.mime_type,
            uploaded_by: actor.user_id.clone(),
            uploaded_at: crate::types::TimeStamp::new(),
        };
        let encoded = minicbor::to_vec(&record).map_err(codec_err)?;
        self.documents.insert(record.id.as_bytes(), encoded)?;
        self.shipment_docs
            .insert(index_key(shipment_id, &record.id), record.id.as_bytes())?;

        self.audit.append(
            actor,
            "document.uploaded",
            "document",
            &record.id,
            Some(format!("{} for {}", record.document_type, shipment.code)),
        );

        Ok(record)
    }

    /// Document metadata, subject to the same visibility rule as the
    /// parent shipment.
    pub fn get_document(&self, actor: &Actor, document_id: &str) -> Result<DocumentRecord> {
        let record = self.load_document(document_id)?;
        let (shipment, _) = self.load_shipment(&record.shipment_id)?;
        self.ensure_visible(actor, &shipment)?;
        Ok(record)
    }

    /// All documents attached to a shipment the actor can see.
    pub fn list_documents(&self, actor: &Actor, shipment_id: &str) -> Result<Vec<DocumentRecord>> {
        let (shipment, _) = self.load_shipment(shipment_id)?;
        self.ensure_visible(actor, &shipment)?;
        self.documents_for(shipment_id)
    }

    /// Remove one document. Creator of the parent shipment or admin.
    pub fn delete_document(&self, actor: &Actor, document_id: &str) -> Result<()> {
        if !actor.role.may(Action::DeleteDocument) {
            return Err(Error::permission(actor.role, "delete documents"));
        }
        let record = self.load_document(document_id)?;
        let (shipment, _) = self.load_shipment(&record.shipment_id)?;
        self.ensure_visible(actor, &shipment)?;
        if actor.role != Role::Admin && shipment.created_by != actor.user_id {
            return Err(Error::permission(actor.role, "delete this document"));
        }

        self.documents.remove(record.id.as_bytes())?;
        self.shipment_docs
            .remove(index_key(&record.shipment_id, &record.id))?;

        self.audit.append(
            actor,
            "document.deleted",
            "document",
            &record.id,
            Some(record.file_name),
        );

        Ok(())
    }

    /// The completeness verdict for a shipment, callable independently
    /// of approval so callers can check before attempting it.
    pub fn document_completeness(&self, actor: &Actor, shipment_id: &str) -> Result<Completeness> {
        let (record, _) = self.load_shipment(shipment_id)?;
        self.ensure_visible(actor, &record)?;
        let mode = self.transport_mode(&record)?;
        let present = self.document_types_for(shipment_id)?;
        Ok(check_completeness(&present, mode))
    }

    /// Admin-only audit read path.
    pub fn audit_entries(&self, actor: &Actor, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        if !actor.role.may(Action::ViewAuditLog) {
            return Err(Error::permission(actor.role, "view audit logs"));
        }
        self.audit.entries(filter)
    }

    /// Admin-only integrity walk over the audit hash chain.
    pub fn verify_audit_chain(&self, actor: &Actor) -> Result<Option<String>> {
        if !actor.role.may(Action::ViewAuditLog) {
            return Err(Error::permission(actor.role, "view audit logs"));
        }
        self.audit.verify_chain()
    }

    // Internal helpers

    fn load_shipment(&self, shipment_id: &str) -> Result<(ShipmentRecord, sled::IVec)> {
        let bytes = self
            .shipments
            .get(shipment_id.as_bytes())?
            .ok_or_else(|| Error::not_found("shipment", shipment_id))?;
        let record = minicbor::decode(&bytes).map_err(codec_err)?;
        Ok((record, bytes))
    }

    fn load_document(&self, document_id: &str) -> Result<DocumentRecord> {
        let bytes = self
            .documents
            .get(document_id.as_bytes())?
            .ok_or_else(|| Error::not_found("document", document_id))?;
        minicbor::decode(&bytes).map_err(codec_err)
    }

    /// Clearance managers only see their own shipments. An invisible
    /// shipment reads as not found so the id's existence never leaks.
    fn ensure_visible(&self, actor: &Actor, record: &ShipmentRecord) -> Result<()> {
        if actor.role.may(Action::ViewAll) || record.created_by == actor.user_id {
            Ok(())
        } else {
            Err(Error::not_found("shipment", &record.id))
        }
    }

    fn transport_mode(&self, record: &ShipmentRecord) -> Result<TransportMode> {
        record
            .details
            .mode()
            .ok_or_else(|| Error::Codec("stored shipment has no transport mode".to_string()))
    }

    /// Compare-and-swap the record against the bytes that were read.
    /// Losing the race means another writer got there first.
    fn store_cas(&self, old: &sled::IVec, record: &ShipmentRecord) -> Result<()> {
        let new = minicbor::to_vec(record).map_err(codec_err)?;
        match self
            .shipments
            .compare_and_swap(record.id.as_bytes(), Some(old), Some(new))?
        {
            Ok(()) => Ok(()),
            Err(_) => Err(Error::StaleWrite),
        }
    }

    /// Claim a unique human-facing code. The 5-digit suffix can collide
    /// within a day, so draw until the index accepts the claim, bounded
    /// so an exhausted code space fails instead of spinning forever.
    fn claim_unique_code(&self, shipment_id: &str) -> Result<String> {
        for _ in 0..MAX_CODE_DRAWS {
            let candidate = utils::new_shipment_code();
            let claim = self.codes.compare_and_swap(
                candidate.as_bytes(),
                None::<&[u8]>,
                Some(shipment_id.as_bytes()),
            )?;
            if claim.is_ok() {
                return Ok(candidate);
            }
        }
        Err(Error::CodesExhausted)
    }

    fn documents_for(&self, shipment_id: &str) -> Result<Vec<DocumentRecord>> {
        let mut out = Vec::new();
        for item in self.shipment_docs.scan_prefix(index_prefix(shipment_id)) {
            let (_, doc_id) = item?;
            let bytes = self
                .documents
                .get(&doc_id)?
                .ok_or_else(|| Error::Codec("dangling document index entry".to_string()))?;
            out.push(minicbor::decode::<DocumentRecord>(&bytes).map_err(codec_err)?);
        }
        out.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(out)
    }

    fn document_types_for(&self, shipment_id: &str) -> Result<Vec<crate::types::DocumentType>> {
        Ok(self
            .documents_for(shipment_id)?
            .iter()
            .map(|d| d.document_type)
            .collect())
    }
}

fn index_prefix(shipment_id: &str) -> Vec<u8> {
    format!("{shipment_id}/").into_bytes()
}

fn index_key(shipment_id: &str, document_id: &str) -> Vec<u8> {
    format!("{shipment_id}/{document_id}").into_bytes()
}
