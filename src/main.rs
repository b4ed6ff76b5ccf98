//src/main.rs

use anyhow::Context;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Settings};
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar
    let app_state = AppState::new(Settings::from_env()?).await?;

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados.")?;

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    if let Some((email, password)) = &app_state.settings.bootstrap_admin {
        app_state
            .auth_service
            .bootstrap_admin(email, password)
            .await
            .context("Falha ao criar o ADMIN inicial")?;
    }

    // Rotas públicas
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    let user_routes = Router::new()
        .route("/", post(handlers::users::create_user))
        .route("/me", get(handlers::auth::get_me))
        .route("/agents", get(handlers::users::list_agents));

    // Rotas estáticas antes de /{id}
    let lead_routes = Router::new()
        .route(
            "/",
            get(handlers::leads::list_leads).post(handlers::leads::create_lead),
        )
        .route("/pipeline", get(handlers::leads::pipeline))
        .route("/export/pdf", get(handlers::reports::export_pdf))
        .route("/export/xlsx", get(handlers::reports::export_xlsx))
        .route("/export/json", get(handlers::reports::export_json))
        .route(
            "/{id}",
            get(handlers::leads::get_lead)
                .put(handlers::leads::update_lead)
                .patch(handlers::leads::update_lead)
                .delete(handlers::leads::delete_lead),
        )
        .route("/{id}/status", post(handlers::leads::change_status))
        .route("/{id}/activities", get(handlers::leads::lead_activities));

    let activity_routes = Router::new()
        .route("/", get(handlers::activity::list_activity_logs))
        .route("/{id}", get(handlers::activity::get_activity_log));

    let dashboard_routes =
        Router::new().route("/summary", get(handlers::dashboard::get_summary));

    // Tudo aqui exige Bearer válido
    let protected = Router::new()
        .nest("/api/users", user_routes)
        .nest("/api/leads", lead_routes)
        .nest("/api/activity-logs", activity_routes)
        .nest("/api/dashboard", dashboard_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api/auth", auth_routes)
        .merge(protected);

    let bind_addr = app_state.settings.bind_addr.clone();
    let app = app.with_state(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {bind_addr}"))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app)
        .await
        .context("Erro no servidor Axum")?;

    Ok(())
}
