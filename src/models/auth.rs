// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::leads::Lead;

// Mapeia o CREATE TYPE user_role do banco.
// Os papéis vêm de fora (provedor de identidade); o domínio só os lê.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    #[sqlx(rename = "GESTOR")]
    #[serde(rename = "GESTOR")]
    Manager,
    #[sqlx(rename = "ATENDENTE")]
    #[serde(rename = "ATENDENTE")]
    Agent,
}

impl Role {
    /// ADMIN e GESTOR enxergam e alteram todos os leads.
    pub fn is_elevated(self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[schema(example = "ana@escola.com")]
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    pub password_hash: String,

    #[schema(example = "Ana Souza")]
    pub full_name: Option<String>,
    pub role: Role,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> String {
        match self.full_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.email.clone(),
        }
    }

    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            display_name: self.display_name(),
            role: self.role,
        }
    }
}

/// Quem está agindo na requisição. É tudo o que o núcleo sabe sobre identidade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub display_name: String,
    pub role: Role,
}

/// O conjunto-base de leads que um ator enxerga (vira o primeiro predicado SQL).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScope {
    All,
    AssignedTo(Uuid),
}

impl AccessScope {
    pub fn admits(&self, lead: &Lead) -> bool {
        match self {
            AccessScope::All => true,
            AccessScope::AssignedTo(agent_id) => lead.assigned_agent_id == Some(*agent_id),
        }
    }
}

// Opção de atendente para os formulários (id + nome)
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentOption {
    pub id: Uuid,
    #[schema(example = "Ana Souza")]
    pub name: String,
    pub role: Role,
}

// Dados para registro de um novo usuário
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserPayload {
    #[validate(email(message = "invalid_email"))]
    #[schema(example = "ana@escola.com")]
    pub email: String,
    #[validate(length(min = 6, message = "password_too_short"))]
    pub password: String,
    #[validate(length(max = 150, message = "too_long"))]
    pub full_name: Option<String>,
}

// Criação de usuário por um ADMIN, já com o papel definido
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[validate(email(message = "invalid_email"))]
    pub email: String,
    #[validate(length(min = 6, message = "password_too_short"))]
    pub password: String,
    #[validate(length(max = 150, message = "too_long"))]
    pub full_name: Option<String>,
    #[schema(example = "ATENDENTE")]
    pub role: Role,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "invalid_email"))]
    pub email: String,
    #[validate(length(min = 6, message = "password_too_short"))]
    pub password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(full_name: Option<&str>, role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            email: "ana@escola.com".into(),
            password_hash: String::new(),
            full_name: full_name.map(str::to_string),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn display_name_falls_back_to_email() {
        assert_eq!(user(Some("Ana Souza"), Role::Agent).display_name(), "Ana Souza");
        assert_eq!(user(Some("  "), Role::Agent).display_name(), "ana@escola.com");
        assert_eq!(user(None, Role::Agent).display_name(), "ana@escola.com");
    }

    #[test]
    fn only_admin_and_manager_are_elevated() {
        assert!(Role::Admin.is_elevated());
        assert!(Role::Manager.is_elevated());
        assert!(!Role::Agent.is_elevated());
    }

    #[test]
    fn roles_use_group_names_on_the_wire() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_string(&Role::Manager)?, "\"GESTOR\"");
        assert_eq!(serde_json::from_str::<Role>("\"ATENDENTE\"")?, Role::Agent);
        Ok(())
    }
}
