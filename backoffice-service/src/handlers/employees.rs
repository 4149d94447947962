use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use service_core::error::AppError;

use crate::authz::AuthContext;
use crate::dtos::employees::CreateEmployeeRequest;
use crate::models::Employee;
use crate::utils::ValidatedJson;
use crate::AppState;

use super::resolve_establishment;

/// List payroll records within the caller's establishment scope
#[utoipa::path(
    get,
    path = "/employees",
    responses(
        (status = 200, description = "Employees in scope", body = [Employee])
    ),
    tag = "Payroll",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let find_options = FindOptions::builder().sort(doc! { "hired_at": -1 }).build();
    let records = state.employees(&ctx).find(doc! {}, Some(find_options)).await?;
    Ok(Json(records))
}

/// Fetch a single payroll record; ownership is validated on the fetch
#[utoipa::path(
    get,
    path = "/employees/{id}",
    params(("id" = String, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Employee", body = Employee),
        (status = 403, description = "Record belongs to another establishment", body = ErrorResponse),
        (status = 404, description = "No such employee", body = ErrorResponse)
    ),
    tag = "Payroll",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let verified = state
        .employees(&ctx)
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Employee not found")))?;
    Ok(Json(verified.into_inner()))
}

/// Add a payroll record in the caller's establishment
#[utoipa::path(
    post,
    path = "/employees",
    request_body = CreateEmployeeRequest,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Payroll",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    State(state): State<AppState>,
    ctx: AuthContext,
    ValidatedJson(req): ValidatedJson<CreateEmployeeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let establishment_id = resolve_establishment(&ctx, req.establishment_id)?;
    let employee = Employee::new(establishment_id, req.name, req.position, req.salary_cents);

    state.employees(&ctx).insert_one(&employee).await?;

    tracing::info!(employee_id = %employee.id, "Employee record created");
    Ok((StatusCode::CREATED, Json(employee)))
}
