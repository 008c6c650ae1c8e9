use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use crate::models::{ApplyState, Parcel, ParcelStatus, PaymentRecord, PaymentStatus};

/// Body for `POST /parcels`. Everything beyond the sender email is an
/// opaque shipment attribute and is stored verbatim.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateParcelRequest {
    #[validate(email)]
    pub email: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ListParcelsQuery {
    pub email: Option<String>,
}

/// Body for `POST /create-payment-intent`.
#[derive(Debug, Deserialize)]
pub struct CreatePaymentIntentRequest {
    pub price: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ClientSecretResponse {
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
}

/// Body for `POST /payments`: the client-reported completed charge.
#[derive(Debug, Deserialize, Validate)]
pub struct ConfirmPaymentRequest {
    #[validate(email)]
    pub email: String,
    #[serde(rename = "parcelId")]
    pub parcel_id: String,
    #[validate(range(min = 0.01))]
    pub amount: f64,
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub currency: String,
    #[serde(rename = "transactionId")]
    #[validate(length(min = 1))]
    pub transaction_id: String,
}

fn default_currency() -> String {
    "usd".to_string()
}

#[derive(Debug, Serialize)]
pub struct InsertAck {
    #[serde(rename = "insertedId")]
    pub inserted_id: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateAck {
    #[serde(rename = "matchedCount")]
    pub matched_count: u64,
    #[serde(rename = "modifiedCount")]
    pub modified_count: u64,
}

#[derive(Debug, Serialize)]
pub struct DeleteAck {
    #[serde(rename = "deletedCount")]
    pub deleted_count: u64,
}

/// Acknowledgment for a confirmed payment: the ledger insert and the
/// parcel transition, reported separately so the caller can see both
/// halves landed.
#[derive(Debug, Serialize)]
pub struct ConfirmPaymentResponse {
    pub payment: InsertAck,
    pub parcel: UpdateAck,
}

#[derive(Debug, Serialize)]
pub struct ParcelResponse {
    pub id: String,
    pub email: String,
    pub status: ParcelStatus,
    pub payment_status: PaymentStatus,
    #[serde(rename = "transactionId", skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(flatten)]
    pub attributes: Value,
}

impl From<Parcel> for ParcelResponse {
    fn from(parcel: Parcel) -> Self {
        Self {
            id: parcel.id.map(|id| id.to_hex()).unwrap_or_default(),
            email: parcel.email,
            status: parcel.status,
            payment_status: parcel.payment_status,
            transaction_id: parcel.transaction_id,
            created_at: parcel
                .created_at
                .try_to_rfc3339_string()
                .unwrap_or_default(),
            attributes: Bson::Document(parcel.attributes).into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub email: String,
    #[serde(rename = "parcelId")]
    pub parcel_id: String,
    pub amount: f64,
    pub currency: String,
    #[serde(rename = "transactionId")]
    pub transaction_id: String,
    #[serde(rename = "paidAt")]
    pub paid_at: String,
    pub apply_state: ApplyState,
}

impl From<PaymentRecord> for PaymentResponse {
    fn from(record: PaymentRecord) -> Self {
        Self {
            id: record.id.map(|id| id.to_hex()).unwrap_or_default(),
            email: record.email,
            parcel_id: record.parcel_id.to_hex(),
            amount: record.amount,
            currency: record.currency,
            transaction_id: record.transaction_id,
            paid_at: record.paid_at.try_to_rfc3339_string().unwrap_or_default(),
            apply_state: record.apply_state,
        }
    }
}
