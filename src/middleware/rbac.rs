// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::Role,
};

/// 1. O Trait que define quais papéis passam
pub trait RoleRequirement: Send + Sync + 'static {
    fn allowed() -> &'static [Role];
}

/// 2. O Extractor (Guardião)
pub struct RequireRole<T>(pub PhantomData<T>);

// 3. Implementação do FromRequestParts
impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleRequirement,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .and_then(Locale::from_header)
            .unwrap_or_default();

        // A. Extrai Usuário (colocado pelo auth_guard)
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or(AppError::InvalidToken)
            .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

        // B. Confere o papel
        if !T::allowed().contains(&user.0.role) {
            return Err(AppError::PermissionDenied(format!(
                "papel {:?} não autorizado para esta ação",
                user.0.role
            ))
            .to_api_error(&locale, &app_state.i18n_store));
        }

        Ok(RequireRole(PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS REQUISITOS (TIPOS)
// ---

pub struct AdminOnly;
impl RoleRequirement for AdminOnly {
    fn allowed() -> &'static [Role] {
        &[Role::Admin]
    }
}
