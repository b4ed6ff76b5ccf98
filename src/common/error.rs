use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::{common::i18n::I18nStore, middleware::i18n::Locale};

// Nosso tipo de erro de domínio. Os handlers convertem para `ApiError`
// com `to_api_error`, que já traduz a mensagem para o idioma do cliente.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Lead {0} não encontrado")]
    LeadNotFound(Uuid),

    #[error("Registro de atividade {0} não encontrado")]
    ActivityLogNotFound(Uuid),

    #[error("Permissão negada: {0}")]
    PermissionDenied(String),

    #[error("Status inválido: '{0}'")]
    InvalidStatus(String),

    // StoreFailure: não tentamos de novo, só propagamos.
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Fonte não encontrada: {0}")]
    FontNotFound(String),

    #[error("Falha ao gerar relatório: {0}")]
    ReportError(String),
}

impl AppError {
    /// Erro de validação de um único campo, com um código (ex: "invalid_date").
    pub fn field(field: &'static str, code: &'static str) -> Self {
        let mut errors = validator::ValidationErrors::new();
        let mut error = validator::ValidationError::new(code);
        error.message = Some(code.into());
        errors.add(field, error);
        AppError::ValidationError(errors)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            AppError::EmailAlreadyExists => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::InvalidToken | AppError::JwtError(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::UserNotFound | AppError::LeadNotFound(_) | AppError::ActivityLogNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::FontNotFound(_)
            | AppError::ReportError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message_key(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_error",
            AppError::EmailAlreadyExists => "email_already_exists",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::InvalidToken | AppError::JwtError(_) => "invalid_token",
            AppError::UserNotFound => "user_not_found",
            AppError::LeadNotFound(_) => "lead_not_found",
            AppError::ActivityLogNotFound(_) => "activity_log_not_found",
            AppError::PermissionDenied(_) => "permission_denied",
            AppError::InvalidStatus(_) => "invalid_status",
            AppError::FontNotFound(_) | AppError::ReportError(_) => "report_error",
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_) => "internal_error",
        }
    }

    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status_code();
        let error = store.translate(&locale.0, self.message_key()).to_string();

        let details = match self {
            AppError::ValidationError(errors) => {
                let mut details: HashMap<String, Vec<String>> = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                Some(json!(details))
            }
            AppError::InvalidStatus(value) => Some(json!({ "status": value })),
            AppError::PermissionDenied(reason) => Some(json!({ "reason": reason })),
            _ if status.is_server_error() => {
                // O operador precisa do detalhe; o log guarda a mensagem completa.
                tracing::error!("Erro Interno do Servidor: {}", self);
                Some(json!({ "reason": self.to_string() }))
            }
            _ => None,
        };

        ApiError { status, error, details }
    }
}

// Usado quando não há Locale disponível (ex: dentro do middleware).
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), &I18nStore::default())
            .into_response()
    }
}

// O erro que efetivamente sai na resposta HTTP.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt() -> Locale {
        Locale("pt".to_string())
    }

    #[test]
    fn taxonomy_maps_to_http_status() {
        assert_eq!(AppError::field("name", "required").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidStatus("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::LeadNotFound(Uuid::nil()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::PermissionDenied("lead".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::DatabaseError(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_details_are_grouped_by_field() {
        let api = AppError::field("closingProbability", "out_of_range")
            .to_api_error(&pt(), &I18nStore::new());

        assert_eq!(api.error, "Um ou mais campos são inválidos.");
        assert_eq!(
            api.details,
            Some(json!({ "closingProbability": ["out_of_range"] }))
        );
    }

    #[test]
    fn store_failure_carries_reason_for_operators() {
        let api = AppError::DatabaseError(sqlx::Error::PoolTimedOut)
            .to_api_error(&Locale("en".into()), &I18nStore::new());

        assert_eq!(api.error, "An unexpected error occurred.");
        let reason = api
            .details
            .as_ref()
            .and_then(|d| d.get("reason"))
            .and_then(|r| r.as_str())
            .unwrap_or_default();
        assert!(reason.contains("Erro de banco de dados"));
    }

    #[test]
    fn not_found_has_no_details() {
        let api = AppError::LeadNotFound(Uuid::nil()).to_api_error(&pt(), &I18nStore::new());
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert!(api.details.is_none());
    }
}
