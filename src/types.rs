//! Core vocabulary for the shipment approval workflow: roles, the
//! permission matrix, lifecycle statuses and the shared value types
//! that every persisted record is built from.
use chrono::{DateTime, TimeZone, Utc};
use std::fmt;

/// The closed set of roles an authenticated actor may carry.
///
/// Role is decided at authentication time and is immutable for the
/// duration of a request. Permission checks go through [`Role::may`]
/// so the whole matrix is auditable in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum Role {
    #[n(0)]
    Admin,
    #[n(1)]
    Accounts,
    #[n(2)]
    ClearanceManager,
}

/// Every role-gated operation the service exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateShipment,
    UpdateShipment,
    Approve,
    Reject,
    RequestChanges,
    DeleteShipment,
    UploadDocument,
    DeleteDocument,
    ViewAuditLog,
    /// List or view shipments regardless of who created them.
    ViewAll,
}

impl Role {
    /// The permission matrix. Admin is a superuser and passes every gate;
    /// ownership checks (creator-only edits) are layered on top by the
    /// service and are not expressed here.
    pub fn may(&self, action: Action) -> bool {
        match self {
            Role::Admin => true,
            Role::Accounts => matches!(
                action,
                Action::Approve | Action::Reject | Action::RequestChanges | Action::ViewAll
            ),
            Role::ClearanceManager => matches!(
                action,
                Action::CreateShipment
                    | Action::UpdateShipment
                    | Action::UploadDocument
                    | Action::DeleteDocument
            ),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Accounts => "accounts",
            Role::ClearanceManager => "clearance_manager",
        };
        f.write_str(name)
    }
}

/// The authenticated identity performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}

/// Lifecycle status of a shipment.
///
/// `New`, `InTransit`, `Delivered` and `Cancelled` are reserved: they
/// decode and display but no transition in this engine assigns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum ShipmentStatus {
    #[n(0)]
    New,
    #[n(1)]
    Created,
    #[n(2)]
    Approved,
    #[n(3)]
    Rejected,
    #[n(4)]
    ChangesRequested,
    #[n(5)]
    InTransit,
    #[n(6)]
    Delivered,
    #[n(7)]
    Cancelled,
}

impl ShipmentStatus {
    /// Field edits are only legal before the shipment is locked in by
    /// an approval or a terminal status.
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            ShipmentStatus::New | ShipmentStatus::Created | ShipmentStatus::ChangesRequested
        )
    }

    /// Approve / reject / request-changes all share the same legal
    /// source states.
    pub fn is_reviewable(&self) -> bool {
        matches!(
            self,
            ShipmentStatus::Created | ShipmentStatus::ChangesRequested
        )
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShipmentStatus::New => "new",
            ShipmentStatus::Created => "created",
            ShipmentStatus::Approved => "approved",
            ShipmentStatus::Rejected => "rejected",
            ShipmentStatus::ChangesRequested => "changes_requested",
            ShipmentStatus::InTransit => "in_transit",
            ShipmentStatus::Delivered => "delivered",
            ShipmentStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum TransportMode {
    #[n(0)]
    Air,
    #[n(1)]
    Sea,
    #[n(2)]
    Road,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportMode::Air => "air",
            TransportMode::Sea => "sea",
            TransportMode::Road => "road",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, minicbor::Encode, minicbor::Decode)]
pub enum DocumentType {
    #[n(0)]
    Invoice,
    #[n(1)]
    PackingList,
    #[n(2)]
    BillOfLading,
    #[n(3)]
    AirWaybill,
    #[n(4)]
    Other,
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentType::Invoice => "invoice",
            DocumentType::PackingList => "packing_list",
            DocumentType::BillOfLading => "bill_of_lading",
            DocumentType::AirWaybill => "air_waybill",
            DocumentType::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum Currency {
    #[n(0)]
    USD,
    #[n(1)]
    GBP,
    #[n(2)]
    EUR,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum WeightUnit {
    #[n(0)]
    Kg,
    #[n(1)]
    Lb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum DimensionUnit {
    #[n(0)]
    Cm,
    #[n(1)]
    In,
}

/// Name/address contact triple used for exporter, vendor and receiver.
#[derive(Debug, Clone, Default, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Contact {
    #[n(0)]
    pub name: String,
    #[n(1)]
    pub address: String,
    #[n(2)]
    pub phone: Option<String>,
    #[n(3)]
    pub email: Option<String>,
}

impl Contact {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            phone: None,
            email: None,
        }
    }

    /// Both name and address must be present for validation to pass.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.address.trim().is_empty()
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

// Derived orderings would bound `T: Ord`, which `Utc` does not satisfy;
// delegate to the inner DateTime instead.
impl PartialOrd for TimeStamp<Utc> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeStamp<Utc> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    /// Panics on an invalid calendar date; intended for fixed dates in
    /// tests and demos.
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}
