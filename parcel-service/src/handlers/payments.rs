//! Payment handlers: intent creation, confirmation, history,
//! reconciliation.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use service_core::error::AppError;
use validator::Validate;

use crate::{
    dtos::{
        ClientSecretResponse, ConfirmPaymentRequest, ConfirmPaymentResponse,
        CreatePaymentIntentRequest, InsertAck, PaymentResponse, UpdateAck,
    },
    services::ReconcileSummary,
    AppState,
};

/// Request a card authorization from Stripe for the quoted price and
/// hand the confirmation secret back to the client.
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentIntentRequest>,
) -> Result<Json<ClientSecretResponse>, AppError> {
    let price = payload
        .price
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("invalid price: missing")))?;

    let intent = state.stripe.create_payment_intent(price, "usd").await?;

    Ok(Json(ClientSecretResponse {
        client_secret: intent.client_secret,
    }))
}

/// Record a completed charge and book the parcel it pays for.
pub async fn confirm_payment(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> Result<(StatusCode, Json<ConfirmPaymentResponse>), AppError> {
    payload.validate()?;

    let confirmation = state.coordinator.confirm_payment(payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(ConfirmPaymentResponse {
            payment: InsertAck {
                inserted_id: confirmation.payment_id.to_hex(),
            },
            parcel: UpdateAck {
                matched_count: confirmation.parcel_matched,
                modified_count: confirmation.parcel_modified,
            },
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct PaymentHistoryQuery {
    pub email: Option<String>,
}

/// Payment history for one payer. The payer identity is required:
/// without it the ledger would leak everyone's payments.
pub async fn payment_history(
    State(state): State<AppState>,
    Query(query): Query<PaymentHistoryQuery>,
) -> Result<Json<Vec<PaymentResponse>>, AppError> {
    let email = match query.email.as_deref() {
        Some(email) if !email.is_empty() => email,
        _ => {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "email query parameter is required"
            )))
        }
    };

    let records = state.ledger.list_by_payer(email).await?;
    Ok(Json(records.into_iter().map(PaymentResponse::from).collect()))
}

/// Finalize any ledger entries left pending by a partial failure.
pub async fn reconcile(
    State(state): State<AppState>,
) -> Result<Json<ReconcileSummary>, AppError> {
    let summary = state.coordinator.reconcile_pending().await?;
    Ok(Json(summary))
}
