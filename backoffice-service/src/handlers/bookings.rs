use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use serde::Serialize;
use service_core::error::AppError;
use utoipa::ToSchema;

use crate::authz::AuthContext;
use crate::dtos::bookings::{BookingListParams, CreateBookingRequest, UpdateBookingStatusRequest};
use crate::models::Booking;
use crate::utils::ValidatedJson;
use crate::AppState;

use super::resolve_establishment;

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingListResponse {
    pub bookings: Vec<Booking>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

/// List bookings within the caller's establishment scope
#[utoipa::path(
    get,
    path = "/bookings",
    params(BookingListParams),
    responses(
        (status = 200, description = "Bookings in scope", body = BookingListResponse)
    ),
    tag = "Bookings",
    security(("bearer_auth" = []))
)]
pub async fn list_bookings(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(params): Query<BookingListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(20).clamp(1, 100);
    let skip = (page - 1) * page_size;

    let mut filter = doc! {};
    if let Some(status) = params.status {
        let bson_status = mongodb::bson::to_bson(&status).map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("Failed to serialize status: {}", e))
        })?;
        filter.insert("status", bson_status);
    }

    let bookings = state.bookings(&ctx);
    let total = bookings.count(filter.clone()).await?;

    let find_options = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .skip(skip)
        .limit(page_size as i64)
        .build();
    let records = bookings.find(filter, Some(find_options)).await?;

    Ok(Json(BookingListResponse {
        bookings: records,
        total,
        page,
        page_size,
    }))
}

/// Fetch a single booking; ownership is validated on the fetched record
#[utoipa::path(
    get,
    path = "/bookings/{id}",
    params(("id" = String, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking", body = Booking),
        (status = 403, description = "Booking belongs to another establishment", body = ErrorResponse),
        (status = 404, description = "No such booking", body = ErrorResponse)
    ),
    tag = "Bookings",
    security(("bearer_auth" = []))
)]
pub async fn get_booking(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let verified = state
        .bookings(&ctx)
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Booking not found")))?;
    Ok(Json(verified.into_inner()))
}

/// Create a booking in the caller's establishment
#[utoipa::path(
    post,
    path = "/bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created", body = Booking),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Bookings",
    security(("bearer_auth" = []))
)]
pub async fn create_booking(
    State(state): State<AppState>,
    ctx: AuthContext,
    ValidatedJson(req): ValidatedJson<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.check_out <= req.check_in {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "check_out must be after check_in"
        )));
    }

    let establishment_id = resolve_establishment(&ctx, req.establishment_id)?;
    let booking = Booking::new(
        establishment_id,
        req.guest_name,
        req.accommodation_id,
        req.check_in,
        req.check_out,
    );

    state.bookings(&ctx).insert_one(&booking).await?;

    tracing::info!(booking_id = %booking.id, establishment_id = %booking.establishment_id, "Booking created");
    Ok((StatusCode::CREATED, Json(booking)))
}

/// Update a booking's status
#[utoipa::path(
    patch,
    path = "/bookings/{id}",
    params(("id" = String, Path, description = "Booking id")),
    request_body = UpdateBookingStatusRequest,
    responses(
        (status = 200, description = "Booking updated"),
        (status = 404, description = "No such booking in scope", body = ErrorResponse)
    ),
    tag = "Bookings",
    security(("bearer_auth" = []))
)]
pub async fn update_booking_status(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
    Json(req): Json<UpdateBookingStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let bson_status = mongodb::bson::to_bson(&req.status).map_err(|e| {
        AppError::InternalError(anyhow::anyhow!("Failed to serialize status: {}", e))
    })?;

    let matched = state
        .bookings(&ctx)
        .update_one(doc! { "_id": &id }, doc! { "$set": { "status": bson_status } })
        .await?;

    if matched == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("Booking not found")));
    }

    Ok(Json(serde_json::json!({ "message": "Booking updated" })))
}

/// Delete a booking
#[utoipa::path(
    delete,
    path = "/bookings/{id}",
    params(("id" = String, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking deleted"),
        (status = 404, description = "No such booking in scope", body = ErrorResponse)
    ),
    tag = "Bookings",
    security(("bearer_auth" = []))
)]
pub async fn delete_booking(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = state
        .bookings(&ctx)
        .delete_one(doc! { "_id": &id })
        .await?;

    if deleted == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("Booking not found")));
    }

    Ok(Json(serde_json::json!({ "message": "Booking deleted" })))
}
