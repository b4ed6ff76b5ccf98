// src/config.rs

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, sync::Arc, time::Duration};

use crate::{
    common::i18n::I18nStore,
    db::{ActivityRepository, DashboardRepository, LeadRepository, UserRepository},
    services::{
        activity_service::ActivityService, auth::AuthService, dashboard_service::DashboardService,
        lead_query::LeadQueryService, lead_service::LeadService, report_service::ReportService,
    },
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";
const DEFAULT_FONTS_DIR: &str = "./fonts";

// Configuração lida do ambiente (.env em desenvolvimento)
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub max_connections: u32,
    // Fuso para filtros por data de criação
    pub timezone: String,
    pub fonts_dir: String,
    // (email, senha) do primeiro ADMIN
    pub bootstrap_admin: Option<(String, String)>,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let max_connections = match var("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("DATABASE_MAX_CONNECTIONS inválido: {raw}"))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let bootstrap_admin = match (var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some((email, password)),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            max_connections,
            timezone: var("APP_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            fonts_dir: var("FONTS_DIR").unwrap_or_else(|| DEFAULT_FONTS_DIR.to_string()),
            bootstrap_admin,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub i18n_store: Arc<I18nStore>,
    pub settings: Arc<Settings>,
    pub auth_service: AuthService,
    pub lead_service: LeadService,
    pub lead_query: LeadQueryService,
    pub activity_service: ActivityService,
    pub dashboard_service: DashboardService,
    pub report_service: ReportService,
}

impl AppState {
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::with_pool(db_pool, settings))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_pool(db_pool: PgPool, settings: Settings) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let lead_repo = LeadRepository::new(db_pool.clone());
        let activity_repo = ActivityRepository::new(db_pool.clone());
        let dashboard_repo = DashboardRepository::new(db_pool.clone());

        let auth_service =
            AuthService::new(user_repo.clone(), settings.jwt_secret.clone(), db_pool.clone());
        let lead_service = LeadService::new(
            db_pool.clone(),
            lead_repo.clone(),
            activity_repo.clone(),
            user_repo.clone(),
        );
        let lead_query = LeadQueryService::new(lead_repo.clone(), settings.timezone.clone());
        let activity_service =
            ActivityService::new(activity_repo, lead_repo.clone(), settings.timezone.clone());
        let dashboard_service =
            DashboardService::new(dashboard_repo, lead_repo, settings.timezone.clone());
        let report_service = ReportService::new(user_repo, settings.fonts_dir.clone());

        Self {
            db_pool,
            i18n_store: Arc::new(I18nStore::new()),
            settings: Arc::new(settings),
            auth_service,
            lead_service,
            lead_query,
            activity_service,
            dashboard_service,
            report_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_fill_optional_settings() -> anyhow::Result<()> {
        let settings = Settings::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/leads"),
            ("JWT_SECRET", "segredo"),
        ]))?;

        assert_eq!(settings.bind_addr, "0.0.0.0:3000");
        assert_eq!(settings.max_connections, 5);
        assert_eq!(settings.timezone, "America/Sao_Paulo");
        assert_eq!(settings.fonts_dir, "./fonts");
        assert!(settings.bootstrap_admin.is_none());
        Ok(())
    }

    #[test]
    fn missing_database_url_is_an_error() {
        assert!(Settings::from_lookup(lookup(&[("JWT_SECRET", "segredo")])).is_err());
    }

    #[test]
    fn admin_bootstrap_needs_both_email_and_password() -> anyhow::Result<()> {
        let base = [
            ("DATABASE_URL", "postgres://localhost/leads"),
            ("JWT_SECRET", "segredo"),
            ("ADMIN_EMAIL", "admin@escola.com"),
        ];
        assert!(Settings::from_lookup(lookup(&base))?.bootstrap_admin.is_none());

        let mut full = base.to_vec();
        full.push(("ADMIN_PASSWORD", "troque-me"));
        let settings = Settings::from_lookup(lookup(&full))?;
        assert_eq!(
            settings.bootstrap_admin,
            Some(("admin@escola.com".to_string(), "troque-me".to_string()))
        );
        Ok(())
    }

    #[test]
    fn bad_pool_size_is_reported() {
        let result = Settings::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/leads"),
            ("JWT_SECRET", "segredo"),
            ("DATABASE_MAX_CONNECTIONS", "muitas"),
        ]));
        assert!(result.is_err());
    }
}
