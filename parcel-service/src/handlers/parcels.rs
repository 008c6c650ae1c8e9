//! Parcel CRUD handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use mongodb::bson::{to_document, Document};
use serde_json::Value;
use service_core::error::AppError;
use validator::Validate;

use crate::{
    dtos::{CreateParcelRequest, DeleteAck, InsertAck, ListParcelsQuery, ParcelResponse, UpdateAck},
    models::Parcel,
    services::parse_object_id,
    AppState,
};

/// Fields owned by the service; clients cannot set them directly.
const RESERVED_FIELDS: &[&str] = &[
    "_id",
    "email",
    "status",
    "payment_status",
    "transactionId",
    "createdAt",
];

fn strip_reserved(doc: &mut Document) {
    for field in RESERVED_FIELDS {
        doc.remove(field);
    }
}

pub async fn create_parcel(
    State(state): State<AppState>,
    Json(payload): Json<CreateParcelRequest>,
) -> Result<(StatusCode, Json<InsertAck>), AppError> {
    payload.validate()?;

    let mut attributes = to_document(&payload.attributes)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("invalid parcel attributes: {}", e)))?;
    strip_reserved(&mut attributes);

    let parcel = Parcel::new(payload.email, attributes);
    let inserted_id = state.parcels.create(parcel).await?;

    tracing::info!(parcel_id = %inserted_id.to_hex(), "parcel created");

    Ok((
        StatusCode::CREATED,
        Json(InsertAck {
            inserted_id: inserted_id.to_hex(),
        }),
    ))
}

pub async fn list_parcels(
    State(state): State<AppState>,
    Query(query): Query<ListParcelsQuery>,
) -> Result<Json<Vec<ParcelResponse>>, AppError> {
    let parcels = state.parcels.list(query.email.as_deref()).await?;
    Ok(Json(parcels.into_iter().map(ParcelResponse::from).collect()))
}

pub async fn get_parcel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ParcelResponse>, AppError> {
    let parcel_id = parse_object_id(&id, "parcel")?;
    let parcel = state
        .parcels
        .get(parcel_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("parcel not found")))?;
    Ok(Json(ParcelResponse::from(parcel)))
}

/// Partial update: merges the supplied fields into the parcel,
/// last-write-wins per field. Service-owned fields are ignored.
pub async fn update_parcel(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<UpdateAck>, AppError> {
    let parcel_id = parse_object_id(&id, "parcel")?;

    let Value::Object(fields) = payload else {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "update body must be a JSON object"
        )));
    };
    let mut fields = to_document(&fields)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("invalid update fields: {}", e)))?;
    strip_reserved(&mut fields);

    if fields.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "no updatable fields supplied"
        )));
    }

    let result = state.parcels.update(parcel_id, fields).await?;
    if result.matched_count == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("parcel not found")));
    }

    Ok(Json(UpdateAck {
        matched_count: result.matched_count,
        modified_count: result.modified_count,
    }))
}

pub async fn delete_parcel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteAck>, AppError> {
    let parcel_id = parse_object_id(&id, "parcel")?;
    let result = state.parcels.delete(parcel_id).await?;

    if result.deleted_count > 0 {
        tracing::info!(parcel_id = %parcel_id.to_hex(), "parcel deleted");
    }

    Ok(Json(DeleteAck {
        deleted_count: result.deleted_count,
    }))
}
