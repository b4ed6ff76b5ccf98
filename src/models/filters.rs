// src/models/filters.rs
//
// Parâmetros de busca vindos da query string e suas versões tipadas.

use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        activity::ActivityAction,
        leads::{LeadOrigin, LeadPriority, LeadStatus},
    },
};

// =============================================================================
//  LEADS
// =============================================================================

// Os aliases aceitam os nomes antigos dos formulários (origem, atendente, ...).
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeadFilterParams {
    /// Busca em nome, e-mail e curso (sem diferenciar maiúsculas)
    pub q: Option<String>,
    /// novo | contato | progresso | convertido | perdido
    pub status: Option<String>,
    #[serde(alias = "origem")]
    pub origin: Option<String>,
    /// ID do atendente
    #[serde(alias = "atendente")]
    pub agent: Option<String>,
    #[serde(alias = "prioridade")]
    pub priority: Option<String>,
    pub prob_min: Option<String>,
    pub prob_max: Option<String>,
    /// YYYY-MM-DD, inclusivo
    #[serde(alias = "data_inicial")]
    pub date_from: Option<String>,
    /// YYYY-MM-DD, inclusivo
    #[serde(alias = "data_final")]
    pub date_to: Option<String>,
    /// Campo de ordenação, com '-' para decrescente (padrão: -created_at)
    pub order: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadFilter {
    pub text: Option<String>,
    pub status: Option<LeadStatus>,
    pub origin: Option<LeadOrigin>,
    pub agent_id: Option<Uuid>,
    pub priority: Option<LeadPriority>,
    pub probability_min: Option<i32>,
    pub probability_max: Option<i32>,
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
}

impl LeadFilterParams {
    pub fn to_filter(&self) -> Result<LeadFilter, AppError> {
        Ok(LeadFilter {
            text: present(&self.q).map(str::to_string),
            status: present(&self.status)
                .map(str::parse::<LeadStatus>)
                .transpose()?,
            origin: present(&self.origin)
                .map(str::parse::<LeadOrigin>)
                .transpose()?,
            agent_id: present(&self.agent).map(|v| parse_uuid("agent", v)).transpose()?,
            priority: present(&self.priority)
                .map(str::parse::<LeadPriority>)
                .transpose()?,
            probability_min: present(&self.prob_min)
                .map(|v| parse_int("prob_min", v))
                .transpose()?,
            probability_max: present(&self.prob_max)
                .map(|v| parse_int("prob_max", v))
                .transpose()?,
            created_from: present(&self.date_from)
                .map(|v| parse_date("date_from", v))
                .transpose()?,
            created_to: present(&self.date_to)
                .map(|v| parse_date("date_to", v))
                .transpose()?,
        })
    }

    pub fn ordering(&self) -> LeadOrdering {
        LeadOrdering::parse(present(&self.order))
    }
}

// --- ORDENAÇÃO ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadSortKey {
    Name,
    CreatedAt,
    UpdatedAt,
    Status,
    Priority,
    ClosingProbability,
    CourseValue,
    NextContactDate,
}

impl LeadSortKey {
    fn from_key(key: &str) -> Option<Self> {
        let key = match key {
            "name" => LeadSortKey::Name,
            "created_at" => LeadSortKey::CreatedAt,
            "updated_at" => LeadSortKey::UpdatedAt,
            "status" => LeadSortKey::Status,
            "priority" => LeadSortKey::Priority,
            "closing_probability" => LeadSortKey::ClosingProbability,
            "course_value" => LeadSortKey::CourseValue,
            "next_contact_date" => LeadSortKey::NextContactDate,
            _ => return None,
        };
        Some(key)
    }

    fn column(self) -> &'static str {
        match self {
            LeadSortKey::Name => "l.name",
            LeadSortKey::CreatedAt => "l.created_at",
            LeadSortKey::UpdatedAt => "l.updated_at",
            LeadSortKey::Status => "l.status",
            LeadSortKey::Priority => "l.priority",
            LeadSortKey::ClosingProbability => "l.closing_probability",
            LeadSortKey::CourseValue => "l.course_value",
            LeadSortKey::NextContactDate => "l.next_contact_date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadOrdering {
    pub key: LeadSortKey,
    pub descending: bool,
}

impl Default for LeadOrdering {
    // Mais novos primeiro
    fn default() -> Self {
        Self {
            key: LeadSortKey::CreatedAt,
            descending: true,
        }
    }
}

impl LeadOrdering {
    /// Chave desconhecida cai no padrão, sem erro.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim) else {
            return Self::default();
        };
        let (descending, key) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        LeadSortKey::from_key(key)
            .map(|key| Self { key, descending })
            .unwrap_or_default()
    }

    /// Trecho para o ORDER BY, sempre com `id` para desempate estável.
    pub fn sql(self) -> String {
        let direction = if self.descending { "DESC" } else { "ASC" };
        format!("{} {direction}, l.id {direction}", self.key.column())
    }
}

// =============================================================================
//  LOGS DE ATIVIDADE
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityFilterParams {
    pub lead_id: Option<String>,
    /// Busca no nome do lead
    pub lead: Option<String>,
    pub user_id: Option<String>,
    /// Busca no nome ou e-mail do usuário
    pub user: Option<String>,
    /// created | updated | status_changed | assigned | deleted
    pub action: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityFilter {
    pub lead_id: Option<Uuid>,
    pub lead_text: Option<String>,
    pub user_id: Option<Uuid>,
    pub user_text: Option<String>,
    pub action: Option<ActivityAction>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl ActivityFilterParams {
    pub fn to_filter(&self) -> Result<ActivityFilter, AppError> {
        Ok(ActivityFilter {
            lead_id: present(&self.lead_id)
                .map(|v| parse_uuid("lead_id", v))
                .transpose()?,
            lead_text: present(&self.lead).map(str::to_string),
            user_id: present(&self.user_id)
                .map(|v| parse_uuid("user_id", v))
                .transpose()?,
            user_text: present(&self.user).map(str::to_string),
            action: present(&self.action)
                .map(str::parse::<ActivityAction>)
                .transpose()?,
            date_from: present(&self.date_from)
                .map(|v| parse_date("date_from", v))
                .transpose()?,
            date_to: present(&self.date_to)
                .map(|v| parse_date("date_to", v))
                .transpose()?,
        })
    }
}

// --- helpers ---

// Formulários mandam `status=` vazio; vazio é o mesmo que ausente.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_uuid(field: &'static str, value: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(value).map_err(|_| AppError::field(field, "invalid_uuid"))
}

fn parse_int(field: &'static str, value: &str) -> Result<i32, AppError> {
    value
        .parse::<i32>()
        .map_err(|_| AppError::field(field, "invalid_number"))
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| AppError::field(field, "invalid_date"))
}

/// Escapa os curingas do LIKE para a busca ser por substring literal.
pub fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_are_ignored() -> Result<(), AppError> {
        let params = LeadFilterParams {
            q: Some("  ".into()),
            status: Some(String::new()),
            prob_min: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(params.to_filter()?, LeadFilter::default());
        Ok(())
    }

    #[test]
    fn typed_filter_is_built_from_strings() -> Result<(), AppError> {
        let agent = Uuid::new_v4();
        let params = LeadFilterParams {
            q: Some("ana".into()),
            status: Some("convertido".into()),
            origin: Some("indicacao".into()),
            agent: Some(agent.to_string()),
            priority: Some("alta".into()),
            prob_min: Some("50".into()),
            prob_max: Some("90".into()),
            date_from: Some("2025-01-01".into()),
            date_to: Some("2025-01-31".into()),
            ..Default::default()
        };

        let filter = params.to_filter()?;
        assert_eq!(filter.text.as_deref(), Some("ana"));
        assert_eq!(filter.status, Some(LeadStatus::Converted));
        assert_eq!(filter.origin, Some(LeadOrigin::Referral));
        assert_eq!(filter.agent_id, Some(agent));
        assert_eq!(filter.priority, Some(LeadPriority::High));
        assert_eq!(filter.probability_min, Some(50));
        assert_eq!(filter.probability_max, Some(90));
        assert_eq!(filter.created_from, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(filter.created_to, NaiveDate::from_ymd_opt(2025, 1, 31));
        Ok(())
    }

    #[test]
    fn unknown_status_filter_is_invalid_status() {
        let params = LeadFilterParams {
            status: Some("ganho".into()),
            ..Default::default()
        };
        assert!(matches!(params.to_filter(), Err(AppError::InvalidStatus(_))));
    }

    #[test]
    fn malformed_number_and_date_are_validation_errors() {
        let bad_number = LeadFilterParams {
            prob_min: Some("muito".into()),
            ..Default::default()
        };
        let bad_date = LeadFilterParams {
            date_from: Some("01/02/2025".into()),
            ..Default::default()
        };
        assert!(matches!(bad_number.to_filter(), Err(AppError::ValidationError(_))));
        assert!(matches!(bad_date.to_filter(), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn legacy_parameter_names_are_accepted() -> Result<(), Box<dyn std::error::Error>> {
        let params: LeadFilterParams =
            serde_json::from_str(r#"{ "origem": "evento", "prioridade": "baixa" }"#)?;
        let filter = params.to_filter()?;
        assert_eq!(filter.origin, Some(LeadOrigin::Event));
        assert_eq!(filter.priority, Some(LeadPriority::Low));
        Ok(())
    }

    #[test]
    fn ordering_defaults_to_newest_first() {
        assert_eq!(LeadOrdering::parse(None), LeadOrdering::default());
        assert_eq!(LeadOrdering::default().sql(), "l.created_at DESC, l.id DESC");
    }

    #[test]
    fn ordering_accepts_declared_keys_in_both_directions() {
        let asc = LeadOrdering::parse(Some("name"));
        assert_eq!(asc.sql(), "l.name ASC, l.id ASC");

        let desc = LeadOrdering::parse(Some("-closing_probability"));
        assert_eq!(desc.key, LeadSortKey::ClosingProbability);
        assert!(desc.descending);
    }

    #[test]
    fn unknown_sort_key_falls_back_to_default() {
        assert_eq!(LeadOrdering::parse(Some("-password")), LeadOrdering::default());
        assert_eq!(LeadOrdering::parse(Some("name; DROP TABLE leads")), LeadOrdering::default());
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ana"), "%ana%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn activity_filter_parses_action_and_ids() -> Result<(), AppError> {
        let lead = Uuid::new_v4();
        let params = ActivityFilterParams {
            lead_id: Some(lead.to_string()),
            action: Some("status_changed".into()),
            user: Some("ana".into()),
            ..Default::default()
        };
        let filter = params.to_filter()?;
        assert_eq!(filter.lead_id, Some(lead));
        assert_eq!(filter.action, Some(ActivityAction::StatusChanged));
        assert_eq!(filter.user_text.as_deref(), Some("ana"));
        Ok(())
    }
}
