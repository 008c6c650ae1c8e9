//! Payment confirmation across the ledger and the parcel store.
//!
//! The two collections have no cross-document transaction, so the
//! coordinator runs a two-phase protocol: append the ledger entry
//! tagged `pending-apply` (the durability point), compare-and-set the
//! parcel to paid/booked, then mark the entry `applied`. A recorded
//! payment is never lost; anything left `pending-apply` is finalized by
//! the reconciliation sweep.

use anyhow::anyhow;
use mongodb::bson::{oid::ObjectId, DateTime};
use serde::Serialize;
use service_core::error::AppError;

use crate::dtos::ConfirmPaymentRequest;
use crate::models::{ApplyState, PaymentRecord, PaymentStatus};
use crate::services::{parse_object_id, ParcelRepository, PaymentLedger};

#[derive(Clone)]
pub struct PaymentCoordinator {
    parcels: ParcelRepository,
    ledger: PaymentLedger,
}

/// Outcome of a successful confirmation: the ledger key plus the
/// parcel-side match/modify counts.
#[derive(Debug)]
pub struct PaymentConfirmation {
    pub payment_id: ObjectId,
    pub parcel_matched: u64,
    pub parcel_modified: u64,
}

#[derive(Debug, Default, Serialize)]
pub struct ReconcileSummary {
    pub applied: u64,
    pub rejected: u64,
    pub skipped: u64,
}

impl PaymentCoordinator {
    pub fn new(parcels: ParcelRepository, ledger: PaymentLedger) -> Self {
        Self { parcels, ledger }
    }

    /// Record a completed charge and transition the parcel it pays for.
    ///
    /// A parcel can only be confirmed once: a repeat confirmation fails
    /// with a conflict, both on the cheap pre-check and on the
    /// compare-and-set when two confirmations race.
    pub async fn confirm_payment(
        &self,
        request: ConfirmPaymentRequest,
    ) -> Result<PaymentConfirmation, AppError> {
        let parcel_id = parse_object_id(&request.parcel_id, "parcel")?;

        let parcel = self
            .parcels
            .get(parcel_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("parcel not found")))?;

        if parcel.payment_status == PaymentStatus::Paid {
            return Err(AppError::Conflict(anyhow!(
                "parcel {} is already paid",
                parcel_id.to_hex()
            )));
        }

        // Durability point: from here the payment is recorded and must
        // never be silently dropped.
        let record = PaymentRecord {
            id: None,
            email: request.email.clone(),
            parcel_id,
            amount: request.amount,
            currency: request.currency.clone(),
            transaction_id: request.transaction_id.clone(),
            paid_at: DateTime::now(),
            apply_state: ApplyState::PendingApply,
        };
        let payment_id = self.ledger.append(record).await?;

        let update = match self
            .parcels
            .confirm_booking(parcel_id, &request.transaction_id)
            .await
        {
            Ok(update) => update,
            Err(err) => {
                tracing::error!(
                    payment_id = %payment_id.to_hex(),
                    parcel_id = %parcel_id.to_hex(),
                    error = %err,
                    "parcel update failed after ledger append; entry left pending-apply"
                );
                return Err(AppError::DatabaseError(anyhow!(
                    "payment {} was recorded but the parcel update failed; \
                     the entry is retained for reconciliation",
                    payment_id.to_hex()
                )));
            }
        };

        if update.matched_count == 0 {
            // A concurrent confirmation won the compare-and-set.
            if let Err(err) = self.ledger.mark_rejected(payment_id).await {
                tracing::warn!(
                    payment_id = %payment_id.to_hex(),
                    error = %err,
                    "failed to mark raced ledger entry rejected; reconciliation will settle it"
                );
            }
            return Err(AppError::Conflict(anyhow!(
                "parcel {} was already paid by a concurrent confirmation",
                parcel_id.to_hex()
            )));
        }

        if let Err(err) = self.ledger.mark_applied(payment_id).await {
            // Both writes landed; only the bookkeeping tag is stale.
            tracing::warn!(
                payment_id = %payment_id.to_hex(),
                error = %err,
                "failed to mark ledger entry applied; reconciliation will finalize it"
            );
        }

        tracing::info!(
            payment_id = %payment_id.to_hex(),
            parcel_id = %parcel_id.to_hex(),
            transaction_id = %request.transaction_id,
            amount = request.amount,
            "payment confirmed, parcel booked"
        );

        Ok(PaymentConfirmation {
            payment_id,
            parcel_matched: update.matched_count,
            parcel_modified: update.modified_count,
        })
    }

    /// Finalize ledger entries left `pending-apply` by a crash or a
    /// partial failure. Runs at startup and on demand.
    pub async fn reconcile_pending(&self) -> Result<ReconcileSummary, AppError> {
        let pending = self.ledger.find_pending().await?;
        let mut summary = ReconcileSummary::default();

        for entry in pending {
            let Some(payment_id) = entry.id else {
                summary.skipped += 1;
                continue;
            };

            match self.parcels.get(entry.parcel_id).await? {
                None => {
                    // Parcel deleted while the entry was in flight.
                    tracing::warn!(
                        payment_id = %payment_id.to_hex(),
                        parcel_id = %entry.parcel_id.to_hex(),
                        "pending payment references a missing parcel"
                    );
                    self.ledger.mark_rejected(payment_id).await?;
                    summary.rejected += 1;
                }
                Some(parcel) => match parcel.payment_status {
                    PaymentStatus::Paid
                        if parcel.transaction_id.as_deref()
                            == Some(entry.transaction_id.as_str()) =>
                    {
                        // Our update landed but the tag didn't.
                        self.ledger.mark_applied(payment_id).await?;
                        summary.applied += 1;
                    }
                    PaymentStatus::Paid => {
                        // A different confirmation paid the parcel.
                        self.ledger.mark_rejected(payment_id).await?;
                        summary.rejected += 1;
                    }
                    PaymentStatus::Unpaid => {
                        let update = self
                            .parcels
                            .confirm_booking(entry.parcel_id, &entry.transaction_id)
                            .await?;
                        if update.matched_count > 0 {
                            self.ledger.mark_applied(payment_id).await?;
                            summary.applied += 1;
                        } else {
                            // Raced with a live confirmation; next sweep decides.
                            summary.skipped += 1;
                        }
                    }
                },
            }
        }

        if summary.applied > 0 || summary.rejected > 0 {
            tracing::info!(
                applied = summary.applied,
                rejected = summary.rejected,
                skipped = summary.skipped,
                "reconciled pending payment entries"
            );
        }

        Ok(summary)
    }
}
