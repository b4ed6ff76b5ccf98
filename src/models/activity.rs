// src/models/activity.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;

// Mapeia o CREATE TYPE activity_action do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "activity_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Created,
    Updated,
    StatusChanged,
    Assigned,
    Deleted,
}

impl ActivityAction {
    pub const ALL: [ActivityAction; 5] = [
        ActivityAction::Created,
        ActivityAction::Updated,
        ActivityAction::StatusChanged,
        ActivityAction::Assigned,
        ActivityAction::Deleted,
    ];

    pub fn code(self) -> &'static str {
        match self {
            ActivityAction::Created => "created",
            ActivityAction::Updated => "updated",
            ActivityAction::StatusChanged => "status_changed",
            ActivityAction::Assigned => "assigned",
            ActivityAction::Deleted => "deleted",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ActivityAction::Created => "Lead Criado",
            ActivityAction::Updated => "Lead Atualizado",
            ActivityAction::StatusChanged => "Status Alterado",
            ActivityAction::Assigned => "Atendente Atribuído",
            ActivityAction::Deleted => "Lead Excluído",
        }
    }
}

impl FromStr for ActivityAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ActivityAction::ALL
            .into_iter()
            .find(|action| action.code() == value)
            .ok_or_else(|| AppError::field("action", "invalid_choice"))
    }
}

/// Registro de auditoria já gravado. Nunca é alterado nem apagado.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ActivityLog {
    pub id: Uuid,
    // Referência fraca: o lead pode já ter sido excluído
    pub lead_id: Uuid,
    pub lead_name: String,
    pub user_id: Option<Uuid>,
    // Vem do LEFT JOIN com users
    pub user_name: Option<String>,
    pub action: ActivityAction,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Registro a ser gravado, produzido pelo ciclo de vida do lead.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub action: ActivityAction,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub description: String,
}

impl NewActivity {
    pub fn new(action: ActivityAction, description: impl Into<String>) -> Self {
        Self {
            action,
            old_value: None,
            new_value: None,
            description: description.into(),
        }
    }

    pub fn with_values(mut self, old_value: Option<String>, new_value: Option<String>) -> Self {
        self.old_value = old_value;
        self.new_value = new_value;
        self
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogView {
    pub id: Uuid,
    pub lead_id: Uuid,
    #[schema(example = "Ana Silva")]
    pub lead_name: String,
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub action: ActivityAction,
    #[schema(example = "Status Alterado")]
    pub action_display: &'static str,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl From<ActivityLog> for ActivityLogView {
    fn from(log: ActivityLog) -> Self {
        Self {
            id: log.id,
            lead_id: log.lead_id,
            lead_name: log.lead_name,
            user_id: log.user_id,
            user_name: log.user_name,
            action: log.action,
            action_display: log.action.label(),
            old_value: log.old_value,
            new_value: log.new_value,
            description: log.description,
            timestamp: log.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_serialize_as_snake_case_codes() -> Result<(), serde_json::Error> {
        for action in ActivityAction::ALL {
            let json = serde_json::to_string(&action)?;
            assert_eq!(json, format!("\"{}\"", action.code()));
        }
        Ok(())
    }

    #[test]
    fn unknown_action_filter_is_a_validation_error() {
        assert!(matches!(
            "archived".parse::<ActivityAction>(),
            Err(AppError::ValidationError(_))
        ));
        assert_eq!("assigned".parse::<ActivityAction>().ok(), Some(ActivityAction::Assigned));
    }
}
