use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson};
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{Collection, Database, IndexModel};
use service_core::error::AppError;

use crate::models::{ApplyState, PaymentRecord};

/// Append-only store of completed payments. Entries are the source of
/// truth for "was this payment recorded"; nothing here updates or
/// deletes the payment fields of an entry.
#[derive(Clone)]
pub struct PaymentLedger {
    collection: Collection<PaymentRecord>,
}

impl PaymentLedger {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("payments"),
        }
    }

    pub async fn init_indexes(&self) -> Result<(), AppError> {
        let payer_index = IndexModel::builder()
            .keys(doc! { "email": 1, "paidAt": -1 })
            .options(
                IndexOptions::builder()
                    .name("payer_paid_idx".to_string())
                    .build(),
            )
            .build();

        // The reconciliation sweep scans by apply_state.
        let state_index = IndexModel::builder()
            .keys(doc! { "apply_state": 1 })
            .options(
                IndexOptions::builder()
                    .name("apply_state_idx".to_string())
                    .build(),
            )
            .build();

        self.collection
            .create_indexes([payer_index, state_index], None)
            .await?;
        Ok(())
    }

    /// Unconditional insert; no dedup at this layer.
    pub async fn append(&self, record: PaymentRecord) -> Result<ObjectId, AppError> {
        let result = self.collection.insert_one(record, None).await?;
        result.inserted_id.as_object_id().ok_or_else(|| {
            AppError::DatabaseError(anyhow::anyhow!("inserted payment has a non-ObjectId key"))
        })
    }

    /// Payment history for one payer, newest first. Entries that lost a
    /// confirmation race are excluded.
    pub async fn list_by_payer(&self, email: &str) -> Result<Vec<PaymentRecord>, AppError> {
        let rejected = to_bson(&ApplyState::Rejected)
            .map_err(|e| AppError::DatabaseError(e.into()))?;
        let filter = doc! { "email": email, "apply_state": { "$ne": rejected } };

        let options = FindOptions::builder().sort(doc! { "paidAt": -1 }).build();

        let cursor = self.collection.find(filter, Some(options)).await?;
        let records: Vec<PaymentRecord> = cursor.try_collect().await?;
        Ok(records)
    }

    /// Entries whose parcel update has not been confirmed yet.
    pub async fn find_pending(&self) -> Result<Vec<PaymentRecord>, AppError> {
        let pending = to_bson(&ApplyState::PendingApply)
            .map_err(|e| AppError::DatabaseError(e.into()))?;
        let cursor = self
            .collection
            .find(doc! { "apply_state": pending }, None)
            .await?;
        let records: Vec<PaymentRecord> = cursor.try_collect().await?;
        Ok(records)
    }

    pub async fn mark_applied(&self, id: ObjectId) -> Result<(), AppError> {
        self.set_apply_state(id, ApplyState::Applied).await
    }

    pub async fn mark_rejected(&self, id: ObjectId) -> Result<(), AppError> {
        self.set_apply_state(id, ApplyState::Rejected).await
    }

    async fn set_apply_state(&self, id: ObjectId, state: ApplyState) -> Result<(), AppError> {
        let state = to_bson(&state).map_err(|e| AppError::DatabaseError(e.into()))?;
        self.collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "apply_state": state } },
                None,
            )
            .await?;
        Ok(())
    }
}
