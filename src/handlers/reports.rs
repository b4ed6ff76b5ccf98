// src/handlers/reports.rs

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{filters::LeadFilterParams, leads::LeadView},
};

// GET /api/leads/export/pdf
#[utoipa::path(
    get,
    path = "/api/leads/export/pdf",
    tag = "Reports",
    params(LeadFilterParams),
    responses(
        (status = 200, description = "Relatório em PDF (A4 paisagem)", content_type = "application/pdf"),
        (status = 400, description = "Filtro inválido"),
        (status = 500, description = "Fonte ausente ou falha ao gerar")
    ),
    security(("api_jwt" = []))
)]
pub async fn export_pdf(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Query(params): Query<LeadFilterParams>,
) -> Result<Response, ApiError> {
    let filter = params
        .to_filter()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    // Exportação ignora paginação: o conjunto filtrado inteiro
    let leads = app_state
        .lead_query
        .export(&user.actor(), &filter, params.ordering())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let pdf_bytes = app_state
        .report_service
        .leads_pdf(&leads, &filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    // Configura os Headers para o navegador baixar o PDF
    let headers = [
        (header::CONTENT_TYPE, "application/pdf"),
        (header::CONTENT_DISPOSITION, "attachment; filename=\"leads.pdf\""),
    ];

    Ok((headers, pdf_bytes).into_response())
}

// GET /api/leads/export/xlsx
#[utoipa::path(
    get,
    path = "/api/leads/export/xlsx",
    tag = "Reports",
    params(LeadFilterParams),
    responses(
        (status = 200, description = "Planilha Excel com os leads filtrados", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 400, description = "Filtro inválido"),
        (status = 500, description = "Falha ao gerar")
    ),
    security(("api_jwt" = []))
)]
pub async fn export_xlsx(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Query(params): Query<LeadFilterParams>,
) -> Result<Response, ApiError> {
    let actor = user.actor();
    let filter = params
        .to_filter()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let leads = app_state
        .lead_query
        .export(&actor, &filter, params.ordering())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let xlsx_bytes = app_state
        .report_service
        .leads_xlsx(&leads, &actor)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let headers = [
        (
            header::CONTENT_TYPE,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ),
        (header::CONTENT_DISPOSITION, "attachment; filename=\"leads.xlsx\""),
    ];

    Ok((headers, xlsx_bytes).into_response())
}

// GET /api/leads/export/json
#[utoipa::path(
    get,
    path = "/api/leads/export/json",
    tag = "Reports",
    params(LeadFilterParams),
    responses(
        (status = 200, description = "Todos os leads filtrados, sem paginação", body = Vec<LeadView>),
        (status = 400, description = "Filtro inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn export_json(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Query(params): Query<LeadFilterParams>,
) -> Result<Json<Vec<LeadView>>, ApiError> {
    let actor = user.actor();
    let filter = params
        .to_filter()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let leads = app_state
        .lead_query
        .export(&actor, &filter, params.ordering())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(
        leads
            .into_iter()
            .map(|lead| LeadView::project(lead, &actor))
            .collect(),
    ))
}
