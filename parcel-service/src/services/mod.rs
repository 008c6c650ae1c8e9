mod coordinator;
mod ledger;
mod parcels;
mod stripe;

pub use coordinator::{PaymentConfirmation, PaymentCoordinator, ReconcileSummary};
pub use ledger::PaymentLedger;
pub use parcels::ParcelRepository;
pub use stripe::{PaymentIntent, StripeClient, StripeError};

use anyhow::anyhow;
use mongodb::bson::oid::ObjectId;
use service_core::error::AppError;

/// Convert an opaque string identifier into the store's native key.
/// Malformed input is a client error, never a crash.
pub fn parse_object_id(raw: &str, entity: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw)
        .map_err(|_| AppError::BadRequest(anyhow!("invalid {} identifier: {}", entity, raw)))
}
