//! Smoke Screen Unit tests for shipment approval system components
//!
//! These test are unit tests that span the codebase, testing behavior in
//! isolation from integration scenarios. These are intended as smoke-screen
//! and generally test the happy-path.
#![allow(unused_imports)]

use shipment_approval::{
    documents::{ALLOWED_MIME_TYPES, check_completeness, required_documents},
    notify::{LogNotifier, Notification, Notifier, Recipients},
    shipment::ShipmentDetails,
    types::{
        Action, Contact, Currency, DocumentType, Role, ShipmentStatus, TimeStamp, TransportMode,
        WeightUnit,
    },
    utils::{new_shipment_code, new_uuid_to_bech32},
};

// UTILS MODULE TESTS
#[cfg(test)]
mod utils_tests {
    use super::*;

    /// Test that new_uuid_to_bech32 generates valid bech32-encoded strings
    /// with the correct human-readable prefix
    #[test]
    fn generates_valid_bech32_with_hrp() {
        let result = new_uuid_to_bech32("shp");
        assert!(result.is_ok());

        let encoded = result.unwrap();
        assert!(encoded.starts_with("shp1"));
        assert!(encoded.len() > 10); // UUID should produce substantial output
    }

    /// Test that the function handles empty strings appropriately
    #[test]
    fn handles_empty_hrp() {
        // Empty string should fail
        let result = new_uuid_to_bech32("");
        assert!(result.is_err());
    }

    /// Test that multiple calls generate unique identifiers
    #[test]
    fn generates_unique_ids() {
        let id1 = new_uuid_to_bech32("shp").unwrap();
        let id2 = new_uuid_to_bech32("shp").unwrap();
        let id3 = new_uuid_to_bech32("shp").unwrap();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    /// Test that different HRPs produce different encoded strings
    #[test]
    fn different_hrps_produce_different_encodings() {
        let shipment_id = new_uuid_to_bech32("shp").unwrap();
        let document_id = new_uuid_to_bech32("doc").unwrap();

        assert!(shipment_id.starts_with("shp"));
        assert!(document_id.starts_with("doc"));
        assert_ne!(shipment_id, document_id);
    }

    /// Test that the shipment code embeds today's date
    #[test]
    fn shipment_code_embeds_current_date() {
        let code = new_shipment_code();
        let today = chrono::Utc::now().format("%Y%m%d").to_string();

        assert!(code.starts_with(&format!("SHP-{today}-")));
    }
}

// STATUS / ROLE TESTS
#[cfg(test)]
mod types_tests {
    use super::*;

    /// Test the legal source states for field edits
    #[test]
    fn editable_statuses() {
        assert!(ShipmentStatus::New.is_editable());
        assert!(ShipmentStatus::Created.is_editable());
        assert!(ShipmentStatus::ChangesRequested.is_editable());

        assert!(!ShipmentStatus::Approved.is_editable());
        assert!(!ShipmentStatus::Rejected.is_editable());
        assert!(!ShipmentStatus::InTransit.is_editable());
        assert!(!ShipmentStatus::Delivered.is_editable());
        assert!(!ShipmentStatus::Cancelled.is_editable());
    }

    /// Test the legal source states for review transitions
    #[test]
    fn reviewable_statuses() {
        assert!(ShipmentStatus::Created.is_reviewable());
        assert!(ShipmentStatus::ChangesRequested.is_reviewable());

        assert!(!ShipmentStatus::New.is_reviewable());
        assert!(!ShipmentStatus::Approved.is_reviewable());
        assert!(!ShipmentStatus::Rejected.is_reviewable());
        assert!(!ShipmentStatus::Cancelled.is_reviewable());
    }

    /// Test that statuses display as their wire names
    #[test]
    fn status_wire_names() {
        assert_eq!(ShipmentStatus::ChangesRequested.to_string(), "changes_requested");
        assert_eq!(ShipmentStatus::InTransit.to_string(), "in_transit");
        assert_eq!(Role::ClearanceManager.to_string(), "clearance_manager");
    }

    /// Test the permission matrix row by row against the transition table
    #[test]
    fn permission_matrix_matches_transition_table() {
        // accounts: review transitions and full visibility, nothing else
        let accounts_allowed = [
            Action::Approve,
            Action::Reject,
            Action::RequestChanges,
            Action::ViewAll,
        ];
        // clearance: owns the create/edit/document side
        let clearance_allowed = [
            Action::CreateShipment,
            Action::UpdateShipment,
            Action::UploadDocument,
            Action::DeleteDocument,
        ];
        let all = [
            Action::CreateShipment,
            Action::UpdateShipment,
            Action::Approve,
            Action::Reject,
            Action::RequestChanges,
            Action::DeleteShipment,
            Action::UploadDocument,
            Action::DeleteDocument,
            Action::ViewAuditLog,
            Action::ViewAll,
        ];

        for action in all {
            assert!(Role::Admin.may(action));
            assert_eq!(
                Role::Accounts.may(action),
                accounts_allowed.contains(&action),
                "accounts row disagrees on {action:?}"
            );
            assert_eq!(
                Role::ClearanceManager.may(action),
                clearance_allowed.contains(&action),
                "clearance row disagrees on {action:?}"
            );
        }
    }
}

// DOCUMENT COMPLETENESS TESTS
#[cfg(test)]
mod documents_tests {
    use super::*;

    /// Test the mandatory document rule table per transport mode
    #[test]
    fn rule_table_per_mode() {
        assert_eq!(
            required_documents(TransportMode::Sea),
            [
                DocumentType::Invoice,
                DocumentType::PackingList,
                DocumentType::BillOfLading
            ]
        );
        assert_eq!(
            required_documents(TransportMode::Air),
            [
                DocumentType::Invoice,
                DocumentType::PackingList,
                DocumentType::AirWaybill
            ]
        );
        assert_eq!(
            required_documents(TransportMode::Road),
            [DocumentType::Invoice, DocumentType::PackingList]
        );
    }

    /// Test that the checker reports all missing types at once
    #[test]
    fn reports_every_missing_type() {
        let result = check_completeness(&[], TransportMode::Sea);

        assert!(!result.is_valid);
        assert_eq!(result.missing_documents.len(), 3);
        assert_eq!(result.errors.len(), 3);
    }

    /// Test the allowed upload mime types
    #[test]
    fn allowed_mime_types() {
        assert!(ALLOWED_MIME_TYPES.contains(&"application/pdf"));
        assert!(ALLOWED_MIME_TYPES.contains(&"image/jpeg"));
        assert_eq!(ALLOWED_MIME_TYPES.len(), 2);
    }
}

// SHIPMENT DETAILS TESTS
#[cfg(test)]
mod shipment_tests {
    use super::*;

    /// Test that the builder pattern produces a valid draft
    #[test]
    fn builder_sets_fields() {
        let draft = ShipmentDetails::new()
            .set_exporter(Contact::new("Acme Exports", "1 Dock Rd"))
            .set_vendor(Contact::new("Widget Works", "22 Mill Ln"))
            .set_receiver(Contact::new("Import GmbH", "8 Hafenstr"))
            .set_item_description("widgets")
            .set_weight(500, WeightUnit::Kg)
            .set_declared_value(10_000_00, Currency::EUR)
            .set_pickup_date(TimeStamp::new_with(2026, 5, 1, 0, 0, 0))
            .set_expected_delivery_date(TimeStamp::new_with(2026, 5, 9, 0, 0, 0))
            .set_mode(TransportMode::Air)
            .set_invoice_number("INV-1042")
            .set_container_number("MSKU-884411-0");

        assert!(draft.validate_and_finalise().is_ok());
    }

    /// Test that validate_dates rejects a missing pickup date
    #[test]
    fn validate_dates_rejects_missing_dates() {
        let draft = ShipmentDetails::new()
            .set_expected_delivery_date(TimeStamp::new_with(2026, 5, 9, 0, 0, 0));

        assert!(!draft.validate_dates());
    }
}

// NOTIFICATION TESTS
#[cfg(test)]
mod notify_tests {
    use super::*;

    /// Test recipient resolution per transition type
    #[test]
    fn recipient_resolution() {
        let created = Notification::ShipmentCreated {
            code: "SHP-20260501-00001".into(),
            created_by: "user_cm".into(),
        };
        let changes = Notification::ChangesRequested {
            code: "SHP-20260501-00001".into(),
            creator: "user_cm".into(),
            message: None,
        };

        assert_eq!(created.recipients(), Recipients::AccountsTeam);
        assert_eq!(changes.recipients(), Recipients::User("user_cm".into()));
    }

    /// The default sink must never panic or error, whatever it is handed
    #[test]
    fn log_notifier_swallows_everything() {
        let notifier = LogNotifier;
        notifier.notify(&Notification::ShipmentRejected {
            code: String::new(),
            creator: String::new(),
            reason: String::new(),
        });
    }
}
