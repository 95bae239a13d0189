//! Outbound notification dispatch for lifecycle transitions.
//!
//! Dispatch is best-effort by contract: [`Notifier::notify`] cannot
//! return an error, so a flaky mail relay can never fail or roll back
//! the transition that triggered it.

/// A lifecycle event worth telling someone about. Template selection is
/// keyed by variant; recipient resolution by [`Notification::recipients`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A new shipment awaits review. Broadcast to the accounts team.
    ShipmentCreated { code: String, created_by: String },
    /// Sent to the shipment's creator.
    ShipmentApproved {
        code: String,
        creator: String,
        approved_by: String,
    },
    /// Sent to the shipment's creator, carrying the reviewer's reason.
    ShipmentRejected {
        code: String,
        creator: String,
        reason: String,
    },
    /// Sent to the shipment's creator.
    ChangesRequested {
        code: String,
        creator: String,
        message: Option<String>,
    },
}

/// Who a notification goes to: a role-wide broadcast or one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    AccountsTeam,
    User(String),
}

impl Notification {
    pub fn recipients(&self) -> Recipients {
        match self {
            Notification::ShipmentCreated { .. } => Recipients::AccountsTeam,
            Notification::ShipmentApproved { creator, .. }
            | Notification::ShipmentRejected { creator, .. }
            | Notification::ChangesRequested { creator, .. } => {
                Recipients::User(creator.clone())
            }
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Notification::ShipmentCreated { code, .. } => {
                format!("Shipment {code} submitted for review")
            }
            Notification::ShipmentApproved { code, .. } => format!("Shipment {code} approved"),
            Notification::ShipmentRejected { code, .. } => format!("Shipment {code} rejected"),
            Notification::ChangesRequested { code, .. } => {
                format!("Changes requested on shipment {code}")
            }
        }
    }
}

/// Notification sink. Implementations must swallow their own failures.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Default sink: logs the would-be email. Stands in for the mail relay,
/// which lives outside this crate.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) {
        let recipients = notification.recipients();
        tracing::info!(
            subject = %notification.subject(),
            recipients = ?recipients,
            "notification dispatched"
        );
    }
}
