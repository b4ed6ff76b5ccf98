// src/handlers/activity.rs

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::{
    common::{
        error::ApiError,
        pagination::{PageRequest, Paginated, ACTIVITY_LOG_PAGE_SIZE},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{activity::ActivityLogView, filters::ActivityFilterParams},
};

// GET /api/activity-logs
#[utoipa::path(
    get,
    path = "/api/activity-logs",
    tag = "Activity",
    params(ActivityFilterParams),
    responses(
        (status = 200, description = "Registros de atividade, mais recentes primeiro", body = Paginated<ActivityLogView>),
        (status = 400, description = "Filtro inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_activity_logs(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Query(params): Query<ActivityFilterParams>,
) -> Result<Json<Paginated<ActivityLogView>>, ApiError> {
    let filter = params
        .to_filter()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let page = app_state
        .activity_service
        .search(
            &user.actor(),
            &filter,
            PageRequest::page(params.page.clone(), ACTIVITY_LOG_PAGE_SIZE),
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(page.map(ActivityLogView::from)))
}

// GET /api/activity-logs/{id}
#[utoipa::path(
    get,
    path = "/api/activity-logs/{id}",
    tag = "Activity",
    params(("id" = Uuid, Path, description = "ID do registro")),
    responses(
        (status = 200, description = "Registro de atividade", body = ActivityLogView),
        (status = 403, description = "Registro de lead de outro atendente"),
        (status = 404, description = "Registro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_activity_log(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(log_id): Path<Uuid>,
) -> Result<Json<ActivityLogView>, ApiError> {
    let log = app_state
        .activity_service
        .get(&user.actor(), log_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(log.into()))
}
