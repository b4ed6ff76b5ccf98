// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,
        handlers::users::list_agents,
        handlers::users::create_user,

        // --- LEADS ---
        handlers::leads::list_leads,
        handlers::leads::pipeline,
        handlers::leads::get_lead,
        handlers::leads::lead_activities,
        handlers::leads::create_lead,
        handlers::leads::update_lead,
        handlers::leads::change_status,
        handlers::leads::delete_lead,

        // --- Reports ---
        handlers::reports::export_pdf,
        handlers::reports::export_xlsx,
        handlers::reports::export_json,

        // --- Activity ---
        handlers::activity::list_activity_logs,
        handlers::activity::get_activity_log,

        // --- Dashboard ---
        handlers::dashboard::get_summary,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,
            models::auth::User,
            models::auth::AgentOption,
            models::auth::RegisterUserPayload,
            models::auth::CreateUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- Leads ---
            models::leads::LeadStatus,
            models::leads::LeadOrigin,
            models::leads::LeadPriority,
            models::leads::LeadView,
            models::leads::CreateLeadPayload,
            models::leads::LeadChanges,
            models::leads::ChangeStatusPayload,
            models::leads::ChangeStatusResponse,
            models::leads::PipelineColumn,

            // --- Activity ---
            models::activity::ActivityAction,
            models::activity::ActivityLogView,

            // --- DASHBOARD ---
            models::dashboard::DashboardSummary,
            models::dashboard::StatusCount,
            models::dashboard::OriginCount,
            models::dashboard::AgentRankingEntry,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Dados do Usuário e Atendentes"),
        (name = "Leads", description = "Cadastro, Funil e Status dos Leads"),
        (name = "Reports", description = "Exportação de Leads (PDF, Excel e JSON)"),
        (name = "Activity", description = "Histórico de Atividades"),
        (name = "Dashboard", description = "Indicadores Gerenciais")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_lead_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/leads"));
        assert!(doc.paths.paths.contains_key("/api/leads/{id}/status"));
        assert!(doc.paths.paths.contains_key("/api/activity-logs/{id}"));
        assert!(doc.paths.paths.contains_key("/api/leads/export/xlsx"));
        assert!(!doc.paths.paths.contains_key("/api/auth/logout"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
    }
}
