//! Walkthrough of the full shipment approval lifecycle against a
//! throwaway sled database.
//!
//!     cargo run --example walkthrough

use shipment_approval::{
    documents::DocumentUpload,
    notify::LogNotifier,
    service::{Page, ShipmentService},
    shipment::ShipmentDetails,
    types::{Actor, Contact, Currency, DocumentType, Role, TimeStamp, TransportMode, WeightUnit},
};
use std::sync::Arc;

fn upload(document_type: DocumentType) -> DocumentUpload {
    DocumentUpload {
        document_type,
        file_name: format!("{document_type}.pdf"),
        mime_type: "application/pdf".into(),
        size_bytes: 4_096,
        storage_path: format!("/uploads/{document_type}.pdf"),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let dir = tempfile::tempdir()?;
    let db = Arc::new(sled::open(dir.path().join("walkthrough.db"))?);
    let service = ShipmentService::new(db, Arc::new(LogNotifier))?;

    let clearance = Actor::new("user_clearance", Role::ClearanceManager);
    let accounts = Actor::new("user_accounts", Role::Accounts);
    let admin = Actor::new("user_admin", Role::Admin);

    // A clearance manager drafts and submits a sea shipment.
    let draft = ShipmentDetails::new()
        .set_exporter(Contact::new("Acme Exports", "1 Dock Rd, Felixstowe"))
        .set_vendor(Contact::new("Widget Works", "22 Mill Ln, Leeds"))
        .set_receiver(Contact::new("Import GmbH", "8 Hafenstr, Hamburg"))
        .set_item_description("industrial widgets, palletised")
        .set_weight(1_200, WeightUnit::Kg)
        .set_declared_value(50_000_00, Currency::GBP)
        .set_pickup_date(TimeStamp::new_with(2026, 3, 1, 9, 0, 0))
        .set_expected_delivery_date(TimeStamp::new_with(2026, 3, 20, 9, 0, 0))
        .set_mode(TransportMode::Sea)
        .set_container_number("MSKU-884411-0");

    let shipment = service.create_shipment(&clearance, draft)?;
    println!("created {} with status {}", shipment.code, shipment.status);

    // Approval is refused until the mode's mandatory documents are attached.
    service.attach_document(&clearance, &shipment.id, upload(DocumentType::Invoice))?;
    service.attach_document(&clearance, &shipment.id, upload(DocumentType::PackingList))?;
    match service.approve(&accounts, &shipment.id) {
        Err(err) => println!("approval refused: {err}"),
        Ok(_) => unreachable!("bill of lading is still missing"),
    }

    let verdict = service.document_completeness(&clearance, &shipment.id)?;
    println!("still missing: {:?}", verdict.missing_documents);

    service.attach_document(&clearance, &shipment.id, upload(DocumentType::BillOfLading))?;
    let approved = service.approve(&accounts, &shipment.id)?;
    println!("shipment {} is now {}", approved.code, approved.status);

    // Admin reviews the audit trail.
    let entries = service.audit_entries(&admin, &Default::default())?;
    for entry in &entries {
        println!(
            "audit: {} {} by {} ({})",
            entry.action, entry.entity_id, entry.actor_id, entry.actor_role
        );
    }
    match service.verify_audit_chain(&admin)? {
        None => println!("audit chain intact over {} entries", entries.len()),
        Some(id) => println!("audit chain broken at {id}"),
    }

    let page = service.list_shipments(&admin, Page::default())?;
    println!("{} shipment(s) on record", page.total);

    Ok(())
}
