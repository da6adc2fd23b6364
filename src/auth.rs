//! auth.rs
//!
//! Хранение учётных данных клиента. Вместо глобального хранилища токена
//! `AuthSession` явно передаётся в контекст клиента и в сессии бронирования.
//!
//! Токен - JWT, выданный бэкендом. Подпись проверяет сервер; клиенту нужен только
//! срок действия (`exp`), чтобы не отправлять заведомо протухший токен.

use chrono::Utc;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::UserProfile;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("malformed token: {0}")]
    Malformed(#[from] jsonwebtoken::errors::Error),
    #[error("token expired")]
    Expired,
}

/// Поля JWT, которые интересны клиенту.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    pub exp: i64,
    #[serde(default)]
    pub sub: Option<String>,
}

/// Декодирует полезную нагрузку токена без проверки подписи.
pub fn decode_claims(token: &str) -> Result<TokenClaims, AuthError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    // Аудиторию проверяет сервер; клиенту нужен только exp
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

/// Проверяет, что токен декодируется и ещё не истёк.
pub fn check_token(token: &str) -> Result<TokenClaims, AuthError> {
    let claims = decode_claims(token)?;
    if claims.exp < Utc::now().timestamp() {
        return Err(AuthError::Expired);
    }
    Ok(claims)
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_token: String,
    pub user: UserProfile,
}

/// Сессия аутентификации, разделяемая между компонентами клиента.
#[derive(Debug, Clone, Default)]
pub struct AuthSession {
    inner: Arc<RwLock<Option<Credentials>>>,
}

impl AuthSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Сессия с уже имеющимся токеном (например, из конфигурации).
    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.login(UserProfile::default(), token);
        session
    }

    pub fn login(&self, user: UserProfile, access_token: impl Into<String>) {
        let access_token = access_token.into();
        if access_token.is_empty() {
            warn!("Missing access token during login, ignoring");
            return;
        }
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) =
            Some(Credentials { access_token, user });
    }

    pub fn logout(&self) {
        let previous = self.inner.write().unwrap_or_else(PoisonError::into_inner).take();
        if previous.is_some() {
            info!("Logged out");
        }
    }

    /// Возвращает токен для заголовка Authorization.
    /// Истёкший или нечитаемый токен сбрасывается (авто-выход).
    pub fn bearer(&self) -> Option<String> {
        let token = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| c.access_token.clone())?;

        match check_token(&token) {
            Ok(_) => Some(token),
            Err(AuthError::Expired) => {
                info!("Token expired, logging out");
                self.logout();
                None
            }
            Err(e) => {
                warn!("Invalid token detected: {}", e);
                self.logout();
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.bearer().is_some()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| c.user.clone())
    }
}
