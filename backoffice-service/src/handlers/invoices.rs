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
use crate::dtos::invoices::{CreateInvoiceRequest, InvoiceListParams, UpdateInvoiceStatusRequest};
use crate::models::Invoice;
use crate::utils::ValidatedJson;
use crate::AppState;

use super::resolve_establishment;

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceListResponse {
    pub invoices: Vec<Invoice>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

/// List invoices within the caller's establishment scope
#[utoipa::path(
    get,
    path = "/invoices",
    params(InvoiceListParams),
    responses(
        (status = 200, description = "Invoices in scope", body = InvoiceListResponse)
    ),
    tag = "Invoicing",
    security(("bearer_auth" = []))
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(params): Query<InvoiceListParams>,
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

    let invoices = state.invoices(&ctx);
    let total = invoices.count(filter.clone()).await?;

    let find_options = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .skip(skip)
        .limit(page_size as i64)
        .build();
    let records = invoices.find(filter, Some(find_options)).await?;

    Ok(Json(InvoiceListResponse {
        invoices: records,
        total,
        page,
        page_size,
    }))
}

/// Fetch a single invoice; ownership is validated on the fetched record
#[utoipa::path(
    get,
    path = "/invoices/{id}",
    params(("id" = String, Path, description = "Invoice id")),
    responses(
        (status = 200, description = "Invoice", body = Invoice),
        (status = 403, description = "Invoice belongs to another establishment", body = ErrorResponse),
        (status = 404, description = "No such invoice", body = ErrorResponse)
    ),
    tag = "Invoicing",
    security(("bearer_auth" = []))
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let verified = state
        .invoices(&ctx)
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;
    Ok(Json(verified.into_inner()))
}

/// Raise an invoice against a booking
///
/// The booking is fetched through the validated by-id path and the
/// booking/invoice relationship is checked before anything is written, so
/// an invoice can never attach to a booking in another establishment.
#[utoipa::path(
    post,
    path = "/invoices",
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Invoice created", body = Invoice),
        (status = 403, description = "Cross-establishment relationship rejected", body = ErrorResponse),
        (status = 404, description = "No such booking", body = ErrorResponse)
    ),
    tag = "Invoicing",
    security(("bearer_auth" = []))
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    ctx: AuthContext,
    ValidatedJson(req): ValidatedJson<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let booking = state
        .bookings(&ctx)
        .find_by_id(&req.booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Booking not found")))?;

    let establishment_id = resolve_establishment(&ctx, req.establishment_id)?;
    let invoice = Invoice::new(
        establishment_id,
        req.booking_id,
        req.amount_cents,
        req.currency.to_uppercase(),
    );

    ctx.validate_relationship(&*booking, &invoice)
        .map_err(crate::services::ServiceError::from)?;

    state.invoices(&ctx).insert_one(&invoice).await?;

    tracing::info!(invoice_id = %invoice.id, booking_id = %invoice.booking_id, "Invoice created");
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// Update an invoice's status
#[utoipa::path(
    patch,
    path = "/invoices/{id}",
    params(("id" = String, Path, description = "Invoice id")),
    request_body = UpdateInvoiceStatusRequest,
    responses(
        (status = 200, description = "Invoice updated"),
        (status = 404, description = "No such invoice in scope", body = ErrorResponse)
    ),
    tag = "Invoicing",
    security(("bearer_auth" = []))
)]
pub async fn update_invoice_status(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
    Json(req): Json<UpdateInvoiceStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let bson_status = mongodb::bson::to_bson(&req.status).map_err(|e| {
        AppError::InternalError(anyhow::anyhow!("Failed to serialize status: {}", e))
    })?;

    let matched = state
        .invoices(&ctx)
        .update_one(doc! { "_id": &id }, doc! { "$set": { "status": bson_status } })
        .await?;

    if matched == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("Invoice not found")));
    }

    Ok(Json(serde_json::json!({ "message": "Invoice updated" })))
}

/// Revenue summary grouped by invoice status
///
/// Runs through the aggregation scope injector: scoped callers see totals
/// for their establishment only.
#[utoipa::path(
    get,
    path = "/invoices/summary",
    responses(
        (status = 200, description = "Totals per invoice status")
    ),
    tag = "Invoicing",
    security(("bearer_auth" = []))
)]
pub async fn invoice_summary(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let pipeline = vec![
        doc! { "$group": {
            "_id": "$status",
            "total_cents": { "$sum": "$amount_cents" },
            "count": { "$sum": 1 },
        }},
        doc! { "$sort": { "_id": 1 } },
    ];

    let results = state.invoices(&ctx).aggregate(pipeline).await?;
    Ok(Json(results))
}
