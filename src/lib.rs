pub mod auth;
pub mod config;
pub mod controllers;
pub mod error;
pub mod models;
pub mod reconciler;
pub mod services;

use std::sync::Arc;

use crate::auth::AuthSession;
use crate::services::{ApiError, BackendClient, BookingApi, FeedConnector, WsFeedConnector};

// Контекст клиента: передаётся явно во все контроллеры, глобального состояния нет
#[derive(Clone)]
pub struct ClientContext {
    pub config: config::Config,
    pub backend: BackendClient,
    pub booking_api: Arc<dyn BookingApi>,
    pub feed: Arc<dyn FeedConnector>,
    pub auth: AuthSession,
}

impl ClientContext {
    pub fn new(config: config::Config) -> Result<Self, ApiError> {
        let backend = BackendClient::from_config(&config)?;
        let feed = Arc::new(WsFeedConnector::new(config.api.ws_url.clone()));
        let auth = match config.auth.token.as_deref() {
            Some(token) => AuthSession::with_token(token),
            None => AuthSession::new(),
        };

        Ok(Self {
            booking_api: Arc::new(backend.clone()),
            backend,
            feed,
            auth,
            config,
        })
    }

    /// Подменяет источники данных сессии бронирования (для тестов и альтернативных транспортов).
    pub fn with_booking_sources(
        mut self,
        booking_api: Arc<dyn BookingApi>,
        feed: Arc<dyn FeedConnector>,
    ) -> Self {
        self.booking_api = booking_api;
        self.feed = feed;
        self
    }
}
