// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Actor, AgentOption, Claims, Role, User},
    services::access_policy,
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    pool: PgPool,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String, pool: PgPool) -> Self {
        Self { user_repo, jwt_secret, pool }
    }

    /// Auto-cadastro: sempre entra como ATENDENTE.
    pub async fn register_user(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<String, AppError> {
        let user = self.create_user(email, password, full_name, Role::Agent).await?;
        self.create_token(user.id)
    }

    // Cria um usuário com o papel informado (rota de ADMIN e bootstrap)
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
        role: Role,
    ) -> Result<User, AppError> {
        // 1. Hashing fora do runtime (bcrypt é lento de propósito)
        let password_clone = password.to_owned();
        let hashed_password = tokio::task::spawn_blocking(move || {
            hash(&password_clone, bcrypt::DEFAULT_COST)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        let full_name = full_name.map(str::trim).filter(|n| !n.is_empty());

        // 2. Cria Usuário
        let user = self
            .user_repo
            .create_user(&self.pool, email, &hashed_password, full_name, role)
            .await?;

        tracing::info!(user_id = %user.id, role = ?user.role, "usuário criado");
        Ok(user)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(user.id)
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;

        self.user_repo
            .find_by_id(token_data.claims.sub)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    /// Opções do campo "atendente" para o ator (ATENDENTE só enxerga a si mesmo).
    pub async fn assignable_agents(&self, actor: &Actor) -> Result<Vec<AgentOption>, AppError> {
        self.user_repo
            .list_agents(access_policy::assignable_agent_restriction(actor))
            .await
    }

    /// Cria o primeiro ADMIN a partir do ambiente, se ainda não houver nenhum.
    pub async fn bootstrap_admin(&self, email: &str, password: &str) -> Result<(), AppError> {
        if self.user_repo.admin_exists().await? {
            return Ok(());
        }
        self.create_user(email, password, None, Role::Admin).await?;
        tracing::info!("👤 ADMIN inicial criado ({})", email);
        Ok(())
    }

    fn create_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(7);

        let claims = Claims {
            sub: user_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;

    fn service() -> Result<AuthService, sqlx::Error> {
        // Pool preguiçoso: nenhum teste aqui chega a abrir conexão
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/leads_test")?;
        Ok(AuthService::new(
            UserRepository::new(pool.clone()),
            "segredo-de-teste".into(),
            pool,
        ))
    }

    #[tokio::test]
    async fn issued_token_carries_the_user_id() -> TestResult {
        let svc = service()?;
        let user_id = Uuid::new_v4();
        let token = svc.create_token(user_id)?;

        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"segredo-de-teste"),
            &Validation::default(),
        )?;
        assert_eq!(data.claims.sub, user_id);
        assert!(data.claims.exp > data.claims.iat);
        Ok(())
    }

    #[tokio::test]
    async fn token_signed_with_another_secret_is_rejected() -> TestResult {
        let svc = service()?;
        let claims = Claims {
            sub: Uuid::new_v4(),
            exp: (Utc::now().timestamp() + 3600) as usize,
            iat: Utc::now().timestamp() as usize,
        };
        let forged = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"outro-segredo"),
        )?;

        assert!(matches!(svc.validate_token(&forged).await, Err(AppError::InvalidToken)));
        Ok(())
    }
}
