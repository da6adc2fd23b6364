use tracing::{info, warn};

use crate::auth::AuthSession;
use crate::models::UserProfile;
use crate::services::backend::{LoginForm, LoginResponse, SignupRequest};
use crate::services::{ApiError, BackendClient};

/// Вход, регистрация и выход. Результат входа сохраняется в `AuthSession`.
pub struct AccountController {
    backend: BackendClient,
    auth: AuthSession,
}

impl AccountController {
    pub fn new(backend: BackendClient, auth: AuthSession) -> Self {
        Self { backend, auth }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        let form = LoginForm { username: email.to_string(), password: password.to_string() };
        let response = self.backend.login(&form).await?;
        self.store(response, email)
    }

    /// Регистрация и сразу вход с теми же данными.
    pub async fn signup(&self, request: &SignupRequest) -> Result<UserProfile, ApiError> {
        self.backend.signup(request).await?;
        self.login(&request.email, &request.password).await
    }

    pub async fn google_login(&self, id_token: &str) -> Result<UserProfile, ApiError> {
        let response = self.backend.google_login(id_token).await?;
        let email = response
            .user
            .as_ref()
            .and_then(|u| u.email.clone())
            .unwrap_or_default();
        self.store(response, &email)
    }

    pub fn logout(&self) {
        self.auth.logout();
    }

    fn store(&self, response: LoginResponse, email: &str) -> Result<UserProfile, ApiError> {
        let Some(token) = response.access_token.filter(|t| !t.is_empty()) else {
            warn!("Login response carried no access token");
            return Err(ApiError::Malformed("missing access_token".to_string()));
        };

        let user = response.user.unwrap_or_else(|| UserProfile::from_email(email));
        self.auth.login(user.clone(), token);
        info!("Logged in as {}", user.email.as_deref().unwrap_or(email));
        Ok(user)
    }

    pub fn session(&self) -> &AuthSession {
        &self.auth
    }

    /// Текущий токен, если он ещё действителен.
    pub fn token(&self) -> Option<String> {
        self.auth.bearer()
    }
}
