use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    response::Response,
    routing::{get, patch},
    Json, Router,
};
use tracing::info;

use super::service::{AdminService, DashboardSummary, ExitRequestFilter};
use crate::workflows::moveout::domain::{DamageReport, ExitRequest, ExitRequestId};
use crate::workflows::moveout::error::ServiceError;
use crate::workflows::moveout::exit_requests::router::csv_response;
use crate::workflows::moveout::exit_requests::{
    UpdateFieldsRequest, UpdateStatusRequest, UpdatedExitRequest,
};
use crate::workflows::moveout::identity::{AdminOnly, RequireRole};
use crate::workflows::moveout::MoveOutState;

type Admin = RequireRole<AdminOnly>;

pub fn admin_routes() -> Router<MoveOutState> {
    Router::new()
        .route("/admin/exit-requests", get(list_exit_requests))
        .route("/admin/damage-reports", get(list_damage_reports))
        .route("/admin/update-exit-status", patch(update_status))
        .route("/admin/update-exit-fields", patch(update_fields))
        .route("/admin/dashboard-summary", get(dashboard_summary))
        .route("/admin/export/csv", get(export_csv))
}

async fn list_exit_requests(
    _admin: Admin,
    State(service): State<Arc<AdminService>>,
    filter: Result<Query<ExitRequestFilter>, QueryRejection>,
) -> Result<Json<Vec<ExitRequest>>, ServiceError> {
    let Query(filter) = filter?;
    Ok(Json(service.list_exit_requests(filter).await?))
}

async fn list_damage_reports(
    _admin: Admin,
    State(service): State<Arc<AdminService>>,
) -> Result<Json<Vec<DamageReport>>, ServiceError> {
    Ok(Json(service.list_damage_reports().await?))
}

async fn update_status(
    admin: Admin,
    State(service): State<Arc<AdminService>>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<UpdatedExitRequest>, ServiceError> {
    let Json(body) = body?;
    let request_id = ExitRequestId(body.request_id);
    let request = service.update_status(&request_id, &body.new_status).await?;
    info!(admin = %admin.claims.username, request_id = %request_id, "admin changed exit status");
    Ok(Json(UpdatedExitRequest::status_changed(request)))
}

async fn update_fields(
    admin: Admin,
    State(service): State<Arc<AdminService>>,
    body: Result<Json<UpdateFieldsRequest>, JsonRejection>,
) -> Result<Json<UpdatedExitRequest>, ServiceError> {
    let Json(body) = body?;
    let (request_id, patch) = body.into_parts();
    let request = service.update_fields(&request_id, patch).await?;
    info!(admin = %admin.claims.username, request_id = %request_id, "admin edited exit request");
    Ok(Json(UpdatedExitRequest::fields_changed(request)))
}

async fn dashboard_summary(
    _admin: Admin,
    State(service): State<Arc<AdminService>>,
) -> Result<Json<DashboardSummary>, ServiceError> {
    Ok(Json(service.summary().await?))
}

async fn export_csv(
    _admin: Admin,
    State(service): State<Arc<AdminService>>,
) -> Result<Response, ServiceError> {
    Ok(csv_response(service.export_all().await?))
}
