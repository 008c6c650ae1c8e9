use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::results::{DeleteResult, UpdateResult};
use mongodb::{Collection, Database, IndexModel};
use service_core::error::AppError;

use crate::models::Parcel;

/// Persistent store for parcel bookings.
#[derive(Clone)]
pub struct ParcelRepository {
    collection: Collection<Parcel>,
}

impl ParcelRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("parcels"),
        }
    }

    /// Index for sender-scoped listings ordered by creation time.
    pub async fn init_indexes(&self) -> Result<(), AppError> {
        let sender_index = IndexModel::builder()
            .keys(doc! { "email": 1, "createdAt": -1 })
            .options(
                IndexOptions::builder()
                    .name("sender_created_idx".to_string())
                    .build(),
            )
            .build();

        self.collection.create_indexes([sender_index], None).await?;
        Ok(())
    }

    pub async fn create(&self, parcel: Parcel) -> Result<ObjectId, AppError> {
        let result = self.collection.insert_one(parcel, None).await?;
        result.inserted_id.as_object_id().ok_or_else(|| {
            AppError::DatabaseError(anyhow::anyhow!("inserted parcel has a non-ObjectId key"))
        })
    }

    /// List parcels, optionally restricted to one sender, newest first.
    pub async fn list(&self, sender: Option<&str>) -> Result<Vec<Parcel>, AppError> {
        let filter = match sender {
            Some(email) => doc! { "email": email },
            None => doc! {},
        };

        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .build();

        let cursor = self.collection.find(filter, Some(options)).await?;
        let parcels: Vec<Parcel> = cursor.try_collect().await?;
        Ok(parcels)
    }

    pub async fn get(&self, id: ObjectId) -> Result<Option<Parcel>, AppError> {
        let parcel = self.collection.find_one(doc! { "_id": id }, None).await?;
        Ok(parcel)
    }

    /// Merge the supplied fields into an existing parcel,
    /// last-write-wins per field.
    pub async fn update(&self, id: ObjectId, fields: Document) -> Result<UpdateResult, AppError> {
        let result = self
            .collection
            .update_one(doc! { "_id": id }, doc! { "$set": fields }, None)
            .await?;
        Ok(result)
    }

    /// Idempotent delete: removing an absent parcel reports zero matches
    /// rather than failing.
    pub async fn delete(&self, id: ObjectId) -> Result<DeleteResult, AppError> {
        let result = self.collection.delete_one(doc! { "_id": id }, None).await?;
        Ok(result)
    }

    /// Compare-and-set transition to paid/booked. The filter only
    /// matches while the parcel is still unpaid, so a second
    /// confirmation reports zero matches instead of silently
    /// re-applying.
    pub async fn confirm_booking(
        &self,
        id: ObjectId,
        transaction_id: &str,
    ) -> Result<UpdateResult, AppError> {
        let filter = doc! { "_id": id, "payment_status": "unpaid" };
        let update = doc! {
            "$set": {
                "payment_status": "paid",
                "status": "booked",
                "transactionId": transaction_id,
            }
        };
        let result = self.collection.update_one(filter, update, None).await?;
        Ok(result)
    }
}
