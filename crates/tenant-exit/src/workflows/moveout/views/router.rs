use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use super::projections::{ApprovedExitView, RoomHistoryEntry, TenantExitView, TimelineEvent};
use super::MoveOutViews;
use crate::workflows::moveout::error::ServiceError;
use crate::workflows::moveout::identity::{LandlordOnly, RequireRole, TenantOnly};
use crate::workflows::moveout::MoveOutState;

pub fn landlord_routes() -> Router<MoveOutState> {
    Router::new()
        .route("/landlord/approved-exits", get(approved_exits))
        .route("/landlord/room-history", get(room_history))
        .route("/landlord/move-timeline", get(move_timeline))
}

pub fn tenant_routes() -> Router<MoveOutState> {
    Router::new().route("/tenant/exit-requests/:tenant_id", get(tenant_exit_requests))
}

async fn approved_exits(
    _landlord: RequireRole<LandlordOnly>,
    State(views): State<Arc<MoveOutViews>>,
) -> Result<Json<Vec<ApprovedExitView>>, ServiceError> {
    Ok(Json(views.approved_exits().await?))
}

async fn room_history(
    _landlord: RequireRole<LandlordOnly>,
    State(views): State<Arc<MoveOutViews>>,
) -> Result<Json<Vec<RoomHistoryEntry>>, ServiceError> {
    Ok(Json(views.room_history().await?))
}

async fn move_timeline(
    _landlord: RequireRole<LandlordOnly>,
    State(views): State<Arc<MoveOutViews>>,
) -> Result<Json<Vec<TimelineEvent>>, ServiceError> {
    Ok(Json(views.move_timeline().await?))
}

async fn tenant_exit_requests(
    _tenant: RequireRole<TenantOnly>,
    State(views): State<Arc<MoveOutViews>>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Vec<TenantExitView>>, ServiceError> {
    Ok(Json(views.tenant_exit_requests(&tenant_id).await?))
}
