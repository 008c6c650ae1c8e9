use mongodb::bson::{oid::ObjectId, DateTime, Document};
use serde::{Deserialize, Serialize};

/// A shipment booking record. Created unpaid/pending; the payment
/// confirmation flow is the only path that moves it to paid/booked.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Parcel {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Sender identity.
    pub email: String,
    pub status: ParcelStatus,
    pub payment_status: PaymentStatus,
    /// Processor reference for the completed charge; absent until paid.
    #[serde(rename = "transactionId", skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime,
    /// Arbitrary shipment attributes supplied by the client
    /// (destination, weight, parcel type, ...). Stored as-is.
    #[serde(flatten)]
    pub attributes: Document,
}

impl Parcel {
    /// Build a new booking in its initial state.
    pub fn new(email: String, attributes: Document) -> Self {
        Self {
            id: None,
            email,
            status: ParcelStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            transaction_id: None,
            created_at: DateTime::now(),
            attributes,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ParcelStatus {
    Pending,
    Booked,
    InTransit,
    Delivered,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

/// An immutable completed-payment fact. The payment fields are never
/// mutated after insert; only `apply_state` moves, tracking whether the
/// parcel-side update has landed.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaymentRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Payer identity.
    pub email: String,
    #[serde(rename = "parcelId")]
    pub parcel_id: ObjectId,
    /// Amount in major currency units, as reported by the client.
    pub amount: f64,
    pub currency: String,
    #[serde(rename = "transactionId")]
    pub transaction_id: String,
    #[serde(rename = "paidAt")]
    pub paid_at: DateTime,
    pub apply_state: ApplyState,
}

/// Two-phase bookkeeping for the ledger/parcel write pair.
///
/// `PendingApply` entries are durable payments whose parcel update has
/// not been confirmed yet; the reconciliation sweep finalizes them.
/// `Rejected` marks an entry that lost a confirmation race and must not
/// appear in payment history.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyState {
    PendingApply,
    Applied,
    Rejected,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn new_parcel_starts_pending_and_unpaid() {
        let parcel = Parcel::new(
            "sender@example.com".to_string(),
            doc! { "destination": "Dhaka", "weight": 2.5 },
        );
        assert_eq!(parcel.status, ParcelStatus::Pending);
        assert_eq!(parcel.payment_status, PaymentStatus::Unpaid);
        assert!(parcel.transaction_id.is_none());
        assert!(parcel.id.is_none());
    }

    #[test]
    fn status_wire_names_are_stable() {
        assert_eq!(
            serde_json::to_string(&ParcelStatus::InTransit).unwrap(),
            "\"in-transit\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Unpaid).unwrap(),
            "\"unpaid\""
        );
        assert_eq!(
            serde_json::to_string(&ApplyState::PendingApply).unwrap(),
            "\"pending-apply\""
        );
    }

    #[test]
    fn parcel_json_uses_original_field_names() {
        let mut parcel = Parcel::new("sender@example.com".to_string(), doc! {});
        parcel.transaction_id = Some("tx_1".to_string());
        let json = serde_json::to_value(&parcel).unwrap();
        assert!(json.get("transactionId").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("payment_status").is_some());
    }
}
