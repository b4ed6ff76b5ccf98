// src/models/leads.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidateEmail, ValidationError, ValidationErrors};

use crate::common::error::AppError;

// --- ENUMS ---

// Mapeia o CREATE TYPE lead_status do banco.
// A ordem das variantes é a ordem do funil (e do kanban).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "lead_status")]
pub enum LeadStatus {
    #[sqlx(rename = "novo")]
    #[serde(rename = "novo")]
    New,
    #[sqlx(rename = "contato")]
    #[serde(rename = "contato")]
    Contacted,
    #[sqlx(rename = "progresso")]
    #[serde(rename = "progresso")]
    InProgress,
    #[sqlx(rename = "convertido")]
    #[serde(rename = "convertido")]
    Converted,
    #[sqlx(rename = "perdido")]
    #[serde(rename = "perdido")]
    Lost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 5] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::InProgress,
        LeadStatus::Converted,
        LeadStatus::Lost,
    ];

    pub fn code(self) -> &'static str {
        match self {
            LeadStatus::New => "novo",
            LeadStatus::Contacted => "contato",
            LeadStatus::InProgress => "progresso",
            LeadStatus::Converted => "convertido",
            LeadStatus::Lost => "perdido",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LeadStatus::New => "Novo",
            LeadStatus::Contacted => "Em Contato",
            LeadStatus::InProgress => "Em Progresso",
            LeadStatus::Converted => "Convertido",
            LeadStatus::Lost => "Perdido",
        }
    }
}

impl Default for LeadStatus {
    fn default() -> Self {
        LeadStatus::New
    }
}

impl FromStr for LeadStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        LeadStatus::ALL
            .into_iter()
            .find(|status| status.code() == value)
            .ok_or_else(|| AppError::InvalidStatus(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "lead_origin")]
pub enum LeadOrigin {
    #[sqlx(rename = "instagram")]
    #[serde(rename = "instagram")]
    Instagram,
    #[sqlx(rename = "whatsapp")]
    #[serde(rename = "whatsapp")]
    WhatsApp,
    #[sqlx(rename = "facebook")]
    #[serde(rename = "facebook")]
    Facebook,
    #[sqlx(rename = "indicacao")]
    #[serde(rename = "indicacao")]
    Referral,
    #[sqlx(rename = "google")]
    #[serde(rename = "google")]
    Google,
    #[sqlx(rename = "organico")]
    #[serde(rename = "organico")]
    Organic,
    #[sqlx(rename = "evento")]
    #[serde(rename = "evento")]
    Event,
}

impl LeadOrigin {
    pub const ALL: [LeadOrigin; 7] = [
        LeadOrigin::Instagram,
        LeadOrigin::WhatsApp,
        LeadOrigin::Facebook,
        LeadOrigin::Referral,
        LeadOrigin::Google,
        LeadOrigin::Organic,
        LeadOrigin::Event,
    ];

    pub fn code(self) -> &'static str {
        match self {
            LeadOrigin::Instagram => "instagram",
            LeadOrigin::WhatsApp => "whatsapp",
            LeadOrigin::Facebook => "facebook",
            LeadOrigin::Referral => "indicacao",
            LeadOrigin::Google => "google",
            LeadOrigin::Organic => "organico",
            LeadOrigin::Event => "evento",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LeadOrigin::Instagram => "Instagram",
            LeadOrigin::WhatsApp => "WhatsApp",
            LeadOrigin::Facebook => "Facebook",
            LeadOrigin::Referral => "Indicação",
            LeadOrigin::Google => "Google",
            LeadOrigin::Organic => "Orgânico",
            LeadOrigin::Event => "Evento",
        }
    }
}

impl Default for LeadOrigin {
    fn default() -> Self {
        LeadOrigin::Organic
    }
}

impl FromStr for LeadOrigin {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        LeadOrigin::ALL
            .into_iter()
            .find(|origin| origin.code() == value)
            .ok_or_else(|| AppError::field("origin", "invalid_choice"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "lead_priority")]
pub enum LeadPriority {
    #[sqlx(rename = "baixa")]
    #[serde(rename = "baixa")]
    Low,
    #[sqlx(rename = "media")]
    #[serde(rename = "media")]
    Medium,
    #[sqlx(rename = "alta")]
    #[serde(rename = "alta")]
    High,
}

impl LeadPriority {
    pub const ALL: [LeadPriority; 3] = [LeadPriority::Low, LeadPriority::Medium, LeadPriority::High];

    pub fn code(self) -> &'static str {
        match self {
            LeadPriority::Low => "baixa",
            LeadPriority::Medium => "media",
            LeadPriority::High => "alta",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LeadPriority::Low => "Baixa",
            LeadPriority::Medium => "Média",
            LeadPriority::High => "Alta",
        }
    }
}

impl Default for LeadPriority {
    fn default() -> Self {
        LeadPriority::Medium
    }
}

impl FromStr for LeadPriority {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        LeadPriority::ALL
            .into_iter()
            .find(|priority| priority.code() == value)
            .ok_or_else(|| AppError::field("priority", "invalid_choice"))
    }
}

// --- LEAD (linha do banco) ---

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub course_of_interest: String,
    pub status: LeadStatus,
    pub origin: LeadOrigin,
    pub priority: LeadPriority,
    pub closing_probability: i32,
    pub course_value: Decimal,
    pub next_contact_date: Option<NaiveDate>,
    pub notes: String,
    pub internal_notes: Option<String>,
    pub assigned_agent_id: Option<Uuid>,
    // Vem do LEFT JOIN com users
    pub assigned_agent_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- DRAFT (os campos editáveis, sem id nem datas) ---

const MAX_NAME: usize = 150;
const MAX_PHONE: usize = 20;
const MAX_EMAIL: usize = 254;
const MAX_COURSE: usize = 120;

/// Conjunto completo de campos editáveis de um lead.
/// O serviço sempre valida o draft final, qualquer que seja a origem da alteração.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadDraft {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub course_of_interest: String,
    pub status: LeadStatus,
    pub origin: LeadOrigin,
    pub priority: LeadPriority,
    pub closing_probability: i32,
    pub course_value: Decimal,
    pub next_contact_date: Option<NaiveDate>,
    pub notes: String,
    pub internal_notes: Option<String>,
    pub assigned_agent_id: Option<Uuid>,
}

impl LeadDraft {
    pub fn from_payload(payload: CreateLeadPayload) -> Result<Self, AppError> {
        let status = match payload.status.as_deref().map(str::trim) {
            None | Some("") => LeadStatus::default(),
            Some(code) => code.parse()?,
        };

        Ok(Self {
            name: payload.name,
            phone: payload.phone,
            email: payload.email,
            course_of_interest: payload.course_of_interest,
            status,
            origin: payload.origin.unwrap_or_default(),
            priority: payload.priority.unwrap_or_default(),
            closing_probability: payload.closing_probability.unwrap_or(0),
            course_value: payload.course_value.unwrap_or(Decimal::ZERO),
            next_contact_date: payload.next_contact_date,
            notes: payload.notes.unwrap_or_default(),
            internal_notes: payload.internal_notes,
            assigned_agent_id: payload.assigned_agent_id,
        }
        .normalized())
    }

    pub fn from_lead(lead: &Lead) -> Self {
        Self {
            name: lead.name.clone(),
            phone: lead.phone.clone(),
            email: lead.email.clone(),
            course_of_interest: lead.course_of_interest.clone(),
            status: lead.status,
            origin: lead.origin,
            priority: lead.priority,
            closing_probability: lead.closing_probability,
            course_value: lead.course_value,
            next_contact_date: lead.next_contact_date,
            notes: lead.notes.clone(),
            internal_notes: lead.internal_notes.clone(),
            assigned_agent_id: lead.assigned_agent_id,
        }
    }

    /// Aplica uma alteração parcial. Campos ausentes ficam como estão.
    pub fn apply(mut self, changes: LeadChanges) -> Result<Self, AppError> {
        if let Some(code) = changes.status.as_deref() {
            self.status = code.trim().parse()?;
        }
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(phone) = changes.phone {
            self.phone = phone;
        }
        if let Some(email) = changes.email {
            self.email = email;
        }
        if let Some(course) = changes.course_of_interest {
            self.course_of_interest = course;
        }
        if let Some(origin) = changes.origin {
            self.origin = origin;
        }
        if let Some(priority) = changes.priority {
            self.priority = priority;
        }
        if let Some(probability) = changes.closing_probability {
            self.closing_probability = probability;
        }
        if let Some(value) = changes.course_value {
            self.course_value = value;
        }
        if let Some(date) = changes.next_contact_date {
            self.next_contact_date = date;
        }
        if let Some(notes) = changes.notes {
            self.notes = notes;
        }
        if let Some(internal) = changes.internal_notes {
            self.internal_notes = internal;
        }
        if let Some(agent) = changes.assigned_agent_id {
            self.assigned_agent_id = agent;
        }
        Ok(self.normalized())
    }

    // Strings vazias em campos opcionais viram NULL (o formulário manda "").
    fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.phone = self.phone.trim().to_string();
        self.course_of_interest = self.course_of_interest.trim().to_string();
        self.email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        self.internal_notes = self.internal_notes.filter(|n| !n.trim().is_empty());
        self
    }

    /// Invariantes do lead: tamanhos, e-mail, probabilidade em [0,100], valor >= 0.
    pub fn check_invariants(&self) -> Result<(), AppError> {
        let mut errors = ValidationErrors::new();

        check_text(&mut errors, "name", &self.name, MAX_NAME);
        check_text(&mut errors, "phone", &self.phone, MAX_PHONE);
        check_text(&mut errors, "courseOfInterest", &self.course_of_interest, MAX_COURSE);

        if let Some(email) = &self.email {
            if email.chars().count() > MAX_EMAIL || !email.validate_email() {
                errors.add("email", coded("invalid_email"));
            }
        }

        if !(0..=100).contains(&self.closing_probability) {
            errors.add("closingProbability", coded("out_of_range"));
        }

        if self.course_value.is_sign_negative() && !self.course_value.is_zero() {
            errors.add("courseValue", coded("negative"));
        } else if self.course_value.normalize().scale() > 2 {
            errors.add("courseValue", coded("max_decimal_places"));
        } else if self.course_value >= Decimal::from(100_000_000) {
            // NUMERIC(10, 2)
            errors.add("courseValue", coded("too_large"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationError(errors))
        }
    }
}

fn coded(code: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(code.into());
    error
}

fn check_text(errors: &mut ValidationErrors, field: &'static str, value: &str, max: usize) {
    if value.is_empty() {
        errors.add(field, coded("required"));
    } else if value.chars().count() > max {
        errors.add(field, coded("too_long"));
    }
}

// --- PAYLOADS ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadPayload {
    #[validate(length(min = 1, max = 150, message = "invalid_length"))]
    #[schema(example = "Ana Silva")]
    pub name: String,

    #[validate(length(min = 1, max = 20, message = "invalid_length"))]
    #[schema(example = "11999990000")]
    pub phone: String,

    #[schema(example = "ana@email.com")]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 120, message = "invalid_length"))]
    #[schema(example = "Engenharia de Software")]
    pub course_of_interest: String,

    // Texto livre para podermos responder InvalidStatus em vez de 422.
    #[schema(example = "novo")]
    pub status: Option<String>,

    pub origin: Option<LeadOrigin>,
    pub priority: Option<LeadPriority>,

    #[validate(range(min = 0, max = 100, message = "out_of_range"))]
    #[schema(example = 40)]
    pub closing_probability: Option<i32>,

    #[schema(value_type = Option<f64>, example = 1500.0)]
    pub course_value: Option<Decimal>,

    #[schema(value_type = Option<String>, format = Date, example = "2025-03-20")]
    pub next_contact_date: Option<NaiveDate>,

    pub notes: Option<String>,
    pub internal_notes: Option<String>,
    pub assigned_agent_id: Option<Uuid>,
}

/// Alteração parcial (PUT/PATCH). Nos campos anuláveis, `null` limpa o valor
/// e a ausência da chave mantém o valor atual.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadChanges {
    #[validate(length(min = 1, max = 150, message = "invalid_length"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 20, message = "invalid_length"))]
    pub phone: Option<String>,

    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<String>>,

    #[validate(length(min = 1, max = 120, message = "invalid_length"))]
    pub course_of_interest: Option<String>,

    #[schema(example = "contato")]
    pub status: Option<String>,

    pub origin: Option<LeadOrigin>,
    pub priority: Option<LeadPriority>,

    #[validate(range(min = 0, max = 100, message = "out_of_range"))]
    pub closing_probability: Option<i32>,

    #[schema(value_type = Option<f64>)]
    pub course_value: Option<Decimal>,

    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>, format = Date)]
    pub next_contact_date: Option<Option<NaiveDate>>,

    pub notes: Option<String>,

    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub internal_notes: Option<Option<String>>,

    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>, format = Uuid)]
    pub assigned_agent_id: Option<Option<Uuid>>,
}

// Distingue "chave ausente" (None) de "chave com null" (Some(None)).
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeStatusPayload {
    #[schema(example = "convertido")]
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStatusResponse {
    pub success: bool,
    // false quando o status pedido já era o atual
    pub changed: bool,
    pub lead: LeadView,
}

// --- PROJEÇÃO (o que sai na API) ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadView {
    pub id: Uuid,
    #[schema(example = "Ana Silva")]
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub course_of_interest: String,
    pub status: LeadStatus,
    #[schema(example = "Novo")]
    pub status_display: &'static str,
    pub origin: LeadOrigin,
    pub origin_display: &'static str,
    pub priority: LeadPriority,
    pub priority_display: &'static str,
    pub closing_probability: i32,
    #[schema(value_type = f64)]
    pub course_value: Decimal,
    #[schema(value_type = Option<String>, format = Date)]
    pub next_contact_date: Option<NaiveDate>,
    pub notes: String,
    // Ausente para quem não pode ver (ATENDENTE)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_notes: Option<String>,
    pub assigned_agent_id: Option<Uuid>,
    pub assigned_agent_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeadView {
    pub fn new(lead: Lead, include_internal_notes: bool) -> Self {
        Self {
            id: lead.id,
            name: lead.name,
            phone: lead.phone,
            email: lead.email,
            course_of_interest: lead.course_of_interest,
            status: lead.status,
            status_display: lead.status.label(),
            origin: lead.origin,
            origin_display: lead.origin.label(),
            priority: lead.priority,
            priority_display: lead.priority.label(),
            closing_probability: lead.closing_probability,
            course_value: lead.course_value,
            next_contact_date: lead.next_contact_date,
            notes: lead.notes,
            internal_notes: if include_internal_notes { lead.internal_notes } else { None },
            assigned_agent_id: lead.assigned_agent_id,
            assigned_agent_name: lead.assigned_agent_name,
            created_at: lead.created_at,
            updated_at: lead.updated_at,
        }
    }
}

// Uma coluna do kanban
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineColumn {
    pub status: LeadStatus,
    #[schema(example = "Em Contato")]
    pub label: &'static str,
    pub leads: Vec<LeadView>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn lead(name: &str, status: LeadStatus, agent: Option<Uuid>) -> Lead {
        Lead {
            id: Uuid::new_v4(),
            name: name.to_string(),
            phone: "11999990000".to_string(),
            email: Some(format!("{}@email.com", name.to_lowercase().replace(' ', "."))),
            course_of_interest: "Direito".to_string(),
            status,
            origin: LeadOrigin::Organic,
            priority: LeadPriority::Medium,
            closing_probability: 0,
            course_value: Decimal::ZERO,
            next_contact_date: None,
            notes: String::new(),
            internal_notes: Some("cliente sensível a preço".to_string()),
            assigned_agent_id: agent,
            assigned_agent_name: agent.map(|_| "Atendente".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> CreateLeadPayload {
        CreateLeadPayload {
            name: "Ana Silva".into(),
            phone: "11999990000".into(),
            email: None,
            course_of_interest: "Medicina".into(),
            status: None,
            origin: None,
            priority: None,
            closing_probability: None,
            course_value: None,
            next_contact_date: None,
            notes: None,
            internal_notes: None,
            assigned_agent_id: None,
        }
    }

    #[test]
    fn status_codes_round_trip_through_from_str() {
        for status in LeadStatus::ALL {
            assert_eq!(status.code().parse::<LeadStatus>().ok(), Some(status));
        }
    }

    #[test]
    fn unknown_status_is_invalid_status() {
        assert!(matches!(
            "fechado".parse::<LeadStatus>(),
            Err(AppError::InvalidStatus(value)) if value == "fechado"
        ));
    }

    #[test]
    fn create_defaults_match_the_pipeline_entry_point() -> Result<(), AppError> {
        let draft = LeadDraft::from_payload(payload())?;

        assert_eq!(draft.status, LeadStatus::New);
        assert_eq!(draft.origin, LeadOrigin::Organic);
        assert_eq!(draft.priority, LeadPriority::Medium);
        assert_eq!(draft.closing_probability, 0);
        assert_eq!(draft.course_value, Decimal::ZERO);
        draft.check_invariants()
    }

    #[test]
    fn empty_status_on_create_means_default() -> Result<(), AppError> {
        let draft = LeadDraft::from_payload(CreateLeadPayload {
            status: Some(String::new()),
            ..payload()
        })?;
        assert_eq!(draft.status, LeadStatus::New);
        Ok(())
    }

    #[test]
    fn probability_outside_range_is_rejected() -> Result<(), AppError> {
        let mut draft = LeadDraft::from_payload(payload())?;
        draft.closing_probability = 101;

        let Err(AppError::ValidationError(errors)) = draft.check_invariants() else {
            panic!("probabilidade 101 deveria falhar");
        };
        assert!(errors.field_errors().contains_key("closingProbability"));
        Ok(())
    }

    #[test]
    fn negative_course_value_is_rejected() -> Result<(), AppError> {
        let mut draft = LeadDraft::from_payload(payload())?;
        draft.course_value = Decimal::new(-1, 2);
        assert!(draft.check_invariants().is_err());

        draft.course_value = Decimal::new(150_050, 2);
        draft.check_invariants()
    }

    #[test]
    fn blank_email_becomes_none_and_bad_email_fails() -> Result<(), AppError> {
        let draft = LeadDraft::from_payload(CreateLeadPayload {
            email: Some("   ".into()),
            ..payload()
        })?;
        assert_eq!(draft.email, None);

        let draft = LeadDraft::from_payload(CreateLeadPayload {
            email: Some("nao-e-email".into()),
            ..payload()
        })?;
        assert!(draft.check_invariants().is_err());
        Ok(())
    }

    #[test]
    fn partial_changes_keep_untouched_fields() -> Result<(), Box<dyn std::error::Error>> {
        let prior = LeadDraft::from_payload(CreateLeadPayload {
            email: Some("ana@email.com".into()),
            ..payload()
        })?;

        let changes: LeadChanges =
            serde_json::from_str(r#"{ "status": "contato", "email": null }"#)?;
        let next = prior.clone().apply(changes)?;

        assert_eq!(next.status, LeadStatus::Contacted);
        assert_eq!(next.email, None);
        assert_eq!(next.name, prior.name);
        assert_eq!(next.assigned_agent_id, prior.assigned_agent_id);
        Ok(())
    }

    #[test]
    fn absent_nullable_key_is_not_a_change() -> Result<(), serde_json::Error> {
        let changes: LeadChanges = serde_json::from_str(r#"{ "name": "Bia" }"#)?;
        assert!(changes.email.is_none());
        assert!(changes.assigned_agent_id.is_none());

        let changes: LeadChanges = serde_json::from_str(r#"{ "assignedAgentId": null }"#)?;
        assert_eq!(changes.assigned_agent_id, Some(None));
        Ok(())
    }

    #[test]
    fn projection_hides_internal_notes_when_asked() {
        let lead = fixtures::lead("Ana Silva", LeadStatus::New, None);

        let full = LeadView::new(lead.clone(), true);
        let restricted = LeadView::new(lead, false);

        assert!(full.internal_notes.is_some());
        assert!(restricted.internal_notes.is_none());
        assert_eq!(restricted.status_display, "Novo");
    }
}
