//! Shipment details (draft builder) and the persisted shipment record.
use super::error::ValidationError;
use super::types::{
    Contact, Currency, DimensionUnit, ShipmentStatus, TimeStamp, TransportMode, WeightUnit,
};
use chrono::Utc;

/// Physical dimensions of the consignment. Optional payload; never
/// consulted by lifecycle logic.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Dimensions {
    #[n(0)]
    pub length: u64,
    #[n(1)]
    pub width: u64,
    #[n(2)]
    pub height: u64,
    #[n(3)]
    pub unit: DimensionUnit,
}

/// The business payload of a shipment. Also doubles as the draft
/// builder: fields start empty and `validate_and_finalise` refuses to
/// hand back an incomplete draft.
///
/// Amounts are integers: weight in whole units of `weight_unit`,
/// declared value in minor units of `currency`.
#[derive(Debug, Default, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct ShipmentDetails {
    #[n(0)]
    exporter: Option<Contact>,
    #[n(1)]
    vendor: Option<Contact>,
    #[n(2)]
    receiver: Option<Contact>,
    #[n(3)]
    item_description: Option<String>,
    #[n(4)]
    weight: u64,
    #[n(5)]
    weight_unit: Option<WeightUnit>,
    #[n(6)]
    declared_value: u64,
    #[n(7)]
    currency: Option<Currency>,
    #[n(8)]
    pickup_date: Option<TimeStamp<Utc>>,
    #[n(9)]
    expected_delivery_date: Option<TimeStamp<Utc>>,
    #[n(10)]
    mode_of_transport: Option<TransportMode>,
    #[n(11)]
    dimensions: Option<Dimensions>,
    #[n(12)]
    invoice_number: Option<String>,
    #[n(13)]
    container_number: Option<String>,
    #[n(14)]
    notes: Option<String>,
}

impl ShipmentDetails {
    /// Construct a new builder object, this becomes the basis for a draft
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_exporter(mut self, contact: Contact) -> Self {
        self.exporter = Some(contact);
        self
    }
    pub fn set_vendor(mut self, contact: Contact) -> Self {
        self.vendor = Some(contact);
        self
    }
    pub fn set_receiver(mut self, contact: Contact) -> Self {
        self.receiver = Some(contact);
        self
    }
    pub fn set_item_description(mut self, description: impl Into<String>) -> Self {
        self.item_description = Some(description.into());
        self
    }
    pub fn set_weight(mut self, weight: u64, unit: WeightUnit) -> Self {
        self.weight = weight;
        self.weight_unit = Some(unit);
        self
    }
    pub fn set_declared_value(mut self, value: u64, currency: Currency) -> Self {
        self.declared_value = value;
        self.currency = Some(currency);
        self
    }
    pub fn set_pickup_date(mut self, date: TimeStamp<Utc>) -> Self {
        self.pickup_date = Some(date);
        self
    }
    pub fn set_expected_delivery_date(mut self, date: TimeStamp<Utc>) -> Self {
        self.expected_delivery_date = Some(date);
        self
    }
    pub fn set_mode(mut self, mode: TransportMode) -> Self {
        self.mode_of_transport = Some(mode);
        self
    }
    pub fn set_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
    pub fn set_invoice_number(mut self, number: impl Into<String>) -> Self {
        self.invoice_number = Some(number.into());
        self
    }
    pub fn set_container_number(mut self, number: impl Into<String>) -> Self {
        self.container_number = Some(number.into());
        self
    }
    pub fn set_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn mode(&self) -> Option<TransportMode> {
        self.mode_of_transport
    }
    pub fn item_description(&self) -> Option<&str> {
        self.item_description.as_deref()
    }
    pub fn weight(&self) -> u64 {
        self.weight
    }
    pub fn declared_value(&self) -> u64 {
        self.declared_value
    }

    /// Checks that `pickup_date <= expected_delivery_date`. Equal dates
    /// are legal (same-day delivery).
    pub fn validate_dates(&self) -> bool {
        match (&self.pickup_date, &self.expected_delivery_date) {
            (Some(pickup), Some(delivery)) => {
                pickup.to_datetime_utc() <= delivery.to_datetime_utc()
            }
            _ => false,
        }
    }

    /// Checks every required field and the date ordering invariant.
    /// Failure rejects the whole draft; nothing is persisted from a
    /// draft that did not pass here.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.exporter {
            Some(c) if c.is_complete() => {}
            _ => return Err(ValidationError::MissingField("exporter")),
        }
        match &self.vendor {
            Some(c) if c.is_complete() => {}
            _ => return Err(ValidationError::MissingField("vendor")),
        }
        match &self.receiver {
            Some(c) if c.is_complete() => {}
            _ => return Err(ValidationError::MissingField("receiver")),
        }
        match &self.item_description {
            Some(d) if !d.trim().is_empty() => {}
            _ => return Err(ValidationError::MissingField("item_description")),
        }
        if self.weight_unit.is_none() {
            return Err(ValidationError::MissingField("weight_unit"));
        }
        if self.weight == 0 {
            return Err(ValidationError::NonPositive("weight"));
        }
        if self.currency.is_none() {
            return Err(ValidationError::MissingField("currency"));
        }
        if self.declared_value == 0 {
            return Err(ValidationError::NonPositive("declared_value"));
        }
        if self.pickup_date.is_none() {
            return Err(ValidationError::MissingField("pickup_date"));
        }
        if self.expected_delivery_date.is_none() {
            return Err(ValidationError::MissingField("expected_delivery_date"));
        }
        if self.mode_of_transport.is_none() {
            return Err(ValidationError::MissingField("mode_of_transport"));
        }
        if !self.validate_dates() {
            return Err(ValidationError::DateOrdering);
        }

        Ok(())
    }

    /// Validate and hand the draft back as a finalised details payload.
    pub fn validate_and_finalise(self) -> Result<Self, ValidationError> {
        self.validate()?;
        Ok(self)
    }
}

/// The stored shipment aggregate: identity, lifecycle status, ownership
/// and the validated details payload.
///
/// `version` is an optimistic concurrency counter; every mutation goes
/// through compare-and-swap against the previously read record, so a
/// lost race surfaces as a conflict instead of a silent lost update.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct ShipmentRecord {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub code: String,
    #[n(2)]
    pub status: ShipmentStatus,
    #[n(3)]
    pub created_by: String,
    #[n(4)]
    pub last_updated_by: String,
    #[n(5)]
    pub rejection_reason: Option<String>,
    #[n(6)]
    pub version: u64,
    #[n(7)]
    pub created_at: TimeStamp<Utc>,
    #[n(8)]
    pub updated_at: TimeStamp<Utc>,
    #[n(9)]
    pub details: ShipmentDetails,
}

impl ShipmentRecord {
    pub fn new(id: String, code: String, created_by: String, details: ShipmentDetails) -> Self {
        let now = TimeStamp::new();
        Self {
            id,
            code,
            status: ShipmentStatus::Created,
            last_updated_by: created_by.clone(),
            created_by,
            rejection_reason: None,
            version: 0,
            created_at: now.clone(),
            updated_at: now,
            details,
        }
    }

    /// Stamp a mutation: bump the version counter and record who
    /// touched the record last. `created_by` never changes.
    pub fn touch(&mut self, updated_by: &str) {
        self.version += 1;
        self.last_updated_by = updated_by.to_string();
        self.updated_at = TimeStamp::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_draft() -> ShipmentDetails {
        let pickup = TimeStamp::new_with(2026, 3, 1, 0, 0, 0);
        let delivery = TimeStamp::new_with(2026, 3, 20, 0, 0, 0);

        ShipmentDetails::new()
            .set_exporter(Contact::new("Acme Exports", "1 Dock Rd, Felixstowe"))
            .set_vendor(Contact::new("Widget Works", "22 Mill Ln, Leeds"))
            .set_receiver(Contact::new("Import GmbH", "8 Hafenstr, Hamburg"))
            .set_item_description("industrial widgets")
            .set_weight(1_200, WeightUnit::Kg)
            .set_declared_value(50_000_00, Currency::GBP)
            .set_pickup_date(pickup)
            .set_expected_delivery_date(delivery)
            .set_mode(TransportMode::Sea)
    }

    #[test]
    fn complete_draft_validates() {
        assert!(complete_draft().validate().is_ok());
    }

    #[test]
    fn missing_receiver_is_rejected() {
        let pickup = TimeStamp::new_with(2026, 3, 1, 0, 0, 0);
        let delivery = TimeStamp::new_with(2026, 3, 20, 0, 0, 0);

        let draft = ShipmentDetails::new()
            .set_exporter(Contact::new("Acme Exports", "1 Dock Rd"))
            .set_vendor(Contact::new("Widget Works", "22 Mill Ln"))
            .set_item_description("widgets")
            .set_weight(10, WeightUnit::Kg)
            .set_declared_value(1_000, Currency::USD)
            .set_pickup_date(pickup)
            .set_expected_delivery_date(delivery)
            .set_mode(TransportMode::Road);

        assert_eq!(
            draft.validate(),
            Err(ValidationError::MissingField("receiver"))
        );
    }

    #[test]
    fn blank_contact_counts_as_missing() {
        let draft = complete_draft().set_exporter(Contact::new("  ", ""));

        assert_eq!(
            draft.validate(),
            Err(ValidationError::MissingField("exporter"))
        );
    }

    #[test]
    fn zero_weight_is_rejected() {
        let draft = complete_draft().set_weight(0, WeightUnit::Kg);

        assert_eq!(draft.validate(), Err(ValidationError::NonPositive("weight")));
    }

    #[test]
    fn pickup_after_delivery_is_rejected() {
        let draft = complete_draft()
            .set_pickup_date(TimeStamp::new_with(2026, 4, 1, 0, 0, 0))
            .set_expected_delivery_date(TimeStamp::new_with(2026, 3, 1, 0, 0, 0));

        assert_eq!(draft.validate(), Err(ValidationError::DateOrdering));
    }

    #[test]
    fn equal_pickup_and_delivery_is_accepted() {
        let same = TimeStamp::new_with(2026, 3, 1, 0, 0, 0);
        let draft = complete_draft()
            .set_pickup_date(same.clone())
            .set_expected_delivery_date(same);

        assert!(draft.validate().is_ok());
    }

    #[test]
    fn details_cbor_roundtrip() {
        let details = complete_draft().validate_and_finalise().unwrap();

        let encoded = minicbor::to_vec(&details).unwrap();
        let decoded: ShipmentDetails = minicbor::decode(&encoded).unwrap();

        assert_eq!(details, decoded);
    }

    #[test]
    fn touch_bumps_version_and_preserves_creator() {
        let details = complete_draft().validate_and_finalise().unwrap();
        let mut record = ShipmentRecord::new(
            "shp1test".into(),
            "SHP-20260301-00001".into(),
            "user_clearance".into(),
            details,
        );

        record.touch("user_admin");

        assert_eq!(record.version, 1);
        assert_eq!(record.created_by, "user_clearance");
        assert_eq!(record.last_updated_by, "user_admin");
    }
}
