// src/handlers/leads.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        pagination::{PageRequest, Paginated, API_LEAD_PAGE_SIZE},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{
        activity::ActivityLogView,
        filters::LeadFilterParams,
        leads::{
            ChangeStatusPayload, ChangeStatusResponse, CreateLeadPayload, LeadChanges, LeadView,
            PipelineColumn,
        },
    },
};

// =============================================================================
//  CONSULTAS
// =============================================================================

// GET /api/leads
#[utoipa::path(
    get,
    path = "/api/leads",
    tag = "Leads",
    params(LeadFilterParams),
    responses(
        (status = 200, description = "Página de leads visíveis", body = Paginated<LeadView>),
        (status = 400, description = "Filtro inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_leads(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Query(params): Query<LeadFilterParams>,
) -> Result<Json<Paginated<LeadView>>, ApiError> {
    let actor = user.actor();
    let filter = params
        .to_filter()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let page = app_state
        .lead_query
        .search(
            &actor,
            &filter,
            params.ordering(),
            PageRequest::page(params.page.clone(), API_LEAD_PAGE_SIZE),
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(page.map(|lead| LeadView::project(lead, &actor))))
}

// GET /api/leads/pipeline
#[utoipa::path(
    get,
    path = "/api/leads/pipeline",
    tag = "Leads",
    responses(
        (status = 200, description = "Colunas do kanban, uma por status", body = Vec<PipelineColumn>)
    ),
    security(("api_jwt" = []))
)]
pub async fn pipeline(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<Json<Vec<PipelineColumn>>, ApiError> {
    let columns = app_state
        .lead_query
        .pipeline(&user.actor())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(columns))
}

// GET /api/leads/{id}
#[utoipa::path(
    get,
    path = "/api/leads/{id}",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Lead", body = LeadView),
        (status = 403, description = "Lead de outro atendente"),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
) -> Result<Json<LeadView>, ApiError> {
    let actor = user.actor();
    let lead = app_state
        .lead_service
        .get(&actor, lead_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(LeadView::project(lead, &actor)))
}

// GET /api/leads/{id}/activities
#[utoipa::path(
    get,
    path = "/api/leads/{id}/activities",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Histórico do lead, mais recente primeiro", body = Vec<ActivityLogView>),
        (status = 403, description = "Lead de outro atendente"),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn lead_activities(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
) -> Result<Json<Vec<ActivityLogView>>, ApiError> {
    let logs = app_state
        .activity_service
        .for_lead(&user.actor(), lead_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(logs.into_iter().map(ActivityLogView::from).collect()))
}

// =============================================================================
//  CICLO DE VIDA
// =============================================================================

// POST /api/leads
#[utoipa::path(
    post,
    path = "/api/leads",
    tag = "Leads",
    request_body = CreateLeadPayload,
    responses(
        (status = 201, description = "Lead criado", body = LeadView),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<CreateLeadPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let actor = user.actor();
    let lead = app_state
        .lead_service
        .create(&actor, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(LeadView::project(lead, &actor))))
}

// PUT/PATCH /api/leads/{id}
// Os dois verbos aceitam alteração parcial: chave ausente mantém o valor.
#[utoipa::path(
    patch,
    path = "/api/leads/{id}",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    request_body = LeadChanges,
    responses(
        (status = 200, description = "Lead atualizado", body = LeadView),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Lead de outro atendente"),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
    Json(changes): Json<LeadChanges>,
) -> Result<Json<LeadView>, ApiError> {
    changes
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let actor = user.actor();
    let lead = app_state
        .lead_service
        .update(&actor, lead_id, changes)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(LeadView::project(lead, &actor)))
}

// POST /api/leads/{id}/status
#[utoipa::path(
    post,
    path = "/api/leads/{id}/status",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    request_body = ChangeStatusPayload,
    responses(
        (status = 200, description = "Status aplicado (ou já era o atual)", body = ChangeStatusResponse),
        (status = 400, description = "Status inválido"),
        (status = 403, description = "Lead de outro atendente"),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn change_status(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
    Json(payload): Json<ChangeStatusPayload>,
) -> Result<Json<ChangeStatusResponse>, ApiError> {
    let actor = user.actor();
    let (lead, changed) = app_state
        .lead_service
        .change_status(&actor, lead_id, &payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ChangeStatusResponse {
        success: true,
        changed,
        lead: LeadView::project(lead, &actor),
    }))
}

// DELETE /api/leads/{id}
#[utoipa::path(
    delete,
    path = "/api/leads/{id}",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 204, description = "Lead removido"),
        (status = 403, description = "Lead de outro atendente"),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state
        .lead_service
        .delete(&user.actor(), lead_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
