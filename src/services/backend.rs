//! backend.rs
//!
//! Клиент REST-бэкенда кинотеатра.
//!
//! Ключевые компоненты:
//! 1.  **BookingApi**: узкий интерфейс, который нужен сессии бронирования
//!     (карта мест, создание, изменение и отмена брони). Его реализует
//!     `BackendClient`, а в тестах - заглушки в памяти.
//! 2.  **BackendClient**: HTTP-клиент на reqwest. Все сетевые вызовы проходят через
//!     `CircuitBreaker`, тела запросов проверяются `validator` до отправки.
//! 3.  **Каталог и учётная запись**: фильмы, сеансы, список своих броней, вход и регистрация.

use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};
use validator::Validate;

use crate::config::Config;
use crate::error::GENERIC_FAILURE;
use crate::models::{
    Booking, BookingId, CreateBookingResponse, Movie, MovieId, Seat, SeatId, Showtime, ShowtimeId,
    UserProfile,
};
use crate::services::circuit_breaker::{CircuitBreaker, CircuitState};

const DEFAULT_MIN_RATING: f64 = 7.0;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Circuit Breaker разомкнут, запрос не отправлялся.
    #[error("backend temporarily unavailable")]
    CircuitOpen,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Сервер ответил ошибкой; `detail` - человекочитаемое сообщение из тела ответа.
    #[error("{detail}")]
    Rejected { status: u16, detail: String },

    #[error("invalid request: {0}")]
    InvalidRequest(#[from] validator::ValidationErrors),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Сообщение для пользователя: `detail` сервера либо общее сообщение.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Rejected { detail, .. } => detail.clone(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

// --- Тела запросов ---

#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct CreateBookingRequest {
    #[validate(range(min = 1))]
    pub showtime_id: ShowtimeId,
    #[validate(length(min = 1, message = "Select at least one seat"))]
    pub seat_ids: Vec<SeatId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct UpdateBookingRequest {
    #[validate(length(min = 1))]
    pub new_seat_ids: Vec<SeatId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct CancelBookingRequest {
    #[validate(length(min = 1))]
    pub seat_ids: Vec<SeatId>,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct LoginForm {
    #[validate(email)]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1))]
    pub first_name: String,
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub retype_password: String,
}

#[derive(Debug, Serialize)]
struct GoogleLoginRequest<'a> {
    id_token: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// То, что нужно сессии бронирования от бэкенда.
#[async_trait]
pub trait BookingApi: Send + Sync {
    async fn fetch_seats(&self, showtime_id: ShowtimeId) -> Result<Vec<Seat>, ApiError>;

    async fn create_booking(
        &self,
        bearer: &str,
        request: &CreateBookingRequest,
    ) -> Result<CreateBookingResponse, ApiError>;

    async fn update_booking(
        &self,
        bearer: &str,
        booking_id: BookingId,
        request: &UpdateBookingRequest,
    ) -> Result<(), ApiError>;

    async fn cancel_booking(
        &self,
        bearer: &str,
        booking_id: BookingId,
        request: &CancelBookingRequest,
    ) -> Result<(), ApiError>;
}

/// Клиент для взаимодействия с REST API кинотеатра.
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    http_client: reqwest::Client,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl BackendClient {
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.request_timeout_seconds))
            .build()?;

        Ok(Self {
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            http_client,
            circuit_breaker: Arc::new(CircuitBreaker::new(
                config.circuit_breaker.failure_threshold,
                config.circuit_breaker.timeout_seconds,
            )),
        })
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        let builder = self
            .http_client
            .request(method, format!("{}{}", self.base_url, path));
        match bearer {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Выполняет запрос через Circuit Breaker и разбирает ошибочный ответ.
    async fn execute(&self, builder: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        if !self.circuit_breaker.can_execute() {
            warn!("Circuit breaker is OPEN - blocking backend request");
            return Err(ApiError::CircuitOpen);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Backend request failed: {:?}", e);
                self.circuit_breaker.record_failure();
                return Err(ApiError::Transport(e));
            }
        };

        let status = response.status();
        if status.is_server_error() {
            self.circuit_breaker.record_failure();
        } else {
            // 4xx - это ответ живого сервера, цепь не размыкаем
            self.circuit_breaker.record_success();
        }

        if status.is_success() {
            return Ok(response);
        }

        let detail = Self::error_detail(status, response).await;
        warn!("Backend rejected request: status={}, detail={}", status, detail);
        Err(ApiError::Rejected { status: status.as_u16(), detail })
    }

    async fn error_detail(status: StatusCode, response: reqwest::Response) -> String {
        let body = response.json::<ErrorBody>().await.ok();
        match body.and_then(|b| b.detail) {
            Some(serde_json::Value::String(detail)) => detail,
            // FastAPI отдаёт ошибки валидации списком - пользователю это не показываем
            Some(other) => {
                debug!("Non-string error detail for {}: {}", status, other);
                GENERIC_FAILURE.to_string()
            }
            None => GENERIC_FAILURE.to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        bearer: Option<&str>,
    ) -> Result<T, ApiError> {
        let response = self.execute(self.request(Method::GET, path, bearer)).await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Malformed(e.to_string()))
    }

    // --- Каталог ---

    pub async fn movies(&self) -> Result<Vec<Movie>, ApiError> {
        self.get_json("/movie/list", None).await
    }

    pub async fn movie(&self, movie_id: MovieId) -> Result<Movie, ApiError> {
        self.get_json(&format!("/movie/{}", movie_id), None).await
    }

    pub async fn currently_showing(&self) -> Result<Vec<Movie>, ApiError> {
        self.get_json("/movie/currently-showing", None).await
    }

    pub async fn upcoming(&self) -> Result<Vec<Movie>, ApiError> {
        self.get_json("/movie/upcoming", None).await
    }

    pub async fn top_rated(&self, min_rating: Option<f64>) -> Result<Vec<Movie>, ApiError> {
        let min_rating = min_rating.unwrap_or(DEFAULT_MIN_RATING);
        let builder = self
            .request(Method::GET, "/movie/top-rated", None)
            .query(&[("min_rating", min_rating)]);
        let response = self.execute(builder).await?;
        Self::decode(response).await
    }

    pub async fn showtimes(&self, movie_id: MovieId) -> Result<Vec<Showtime>, ApiError> {
        // Без завершающего слеша - иначе бэкенд отвечает редиректом
        let builder = self
            .request(Method::GET, "/showtimes", None)
            .query(&[("movie_id", movie_id)]);
        let response = self.execute(builder).await?;
        Self::decode(response).await
    }

    // --- Брони пользователя ---

    pub async fn my_bookings(&self, bearer: &str) -> Result<Vec<Booking>, ApiError> {
        let bookings: Option<Vec<Booking>> = self.get_json("/bookings/me", Some(bearer)).await?;
        Ok(bookings.unwrap_or_default())
    }

    pub async fn booking(&self, bearer: &str, booking_id: BookingId) -> Result<Booking, ApiError> {
        self.get_json(&format!("/bookings/{}", booking_id), Some(bearer)).await
    }

    // --- Учётная запись ---

    pub async fn login(&self, form: &LoginForm) -> Result<LoginResponse, ApiError> {
        form.validate()?;
        let body = serde_urlencoded::to_string(form)
            .map_err(|e| ApiError::Malformed(e.to_string()))?;
        let builder = self
            .request(Method::POST, "/auth/login", None)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body);

        info!("Logging in as {}", form.username);
        let response = self.execute(builder).await?;
        Self::decode(response).await
    }

    pub async fn signup(&self, request: &SignupRequest) -> Result<(), ApiError> {
        request.validate()?;
        let builder = self.request(Method::POST, "/auth/signup", None).json(request);
        self.execute(builder).await?;
        info!("Signed up {}", request.email);
        Ok(())
    }

    pub async fn google_login(&self, id_token: &str) -> Result<LoginResponse, ApiError> {
        let builder = self
            .request(Method::POST, "/auth/google", None)
            .json(&GoogleLoginRequest { id_token });
        let response = self.execute(builder).await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl BookingApi for BackendClient {
    async fn fetch_seats(&self, showtime_id: ShowtimeId) -> Result<Vec<Seat>, ApiError> {
        debug!("Fetching seats for showtime {}", showtime_id);
        self.get_json(&format!("/showtimes/{}/seats", showtime_id), None).await
    }

    async fn create_booking(
        &self,
        bearer: &str,
        request: &CreateBookingRequest,
    ) -> Result<CreateBookingResponse, ApiError> {
        request.validate()?;
        info!(
            "Creating booking: showtime_id={}, seats={:?}",
            request.showtime_id, request.seat_ids
        );
        let builder = self.request(Method::POST, "/bookings", Some(bearer)).json(request);
        let response = self.execute(builder).await?;
        Self::decode(response).await
    }

    async fn update_booking(
        &self,
        bearer: &str,
        booking_id: BookingId,
        request: &UpdateBookingRequest,
    ) -> Result<(), ApiError> {
        request.validate()?;
        info!("Updating booking {}: seats={:?}", booking_id, request.new_seat_ids);
        let builder = self
            .request(Method::PUT, &format!("/bookings/{}/update", booking_id), Some(bearer))
            .json(request);
        self.execute(builder).await?;
        Ok(())
    }

    async fn cancel_booking(
        &self,
        bearer: &str,
        booking_id: BookingId,
        request: &CancelBookingRequest,
    ) -> Result<(), ApiError> {
        request.validate()?;
        info!("Cancelling booking {}: seats={:?}", booking_id, request.seat_ids);
        let builder = self
            .request(Method::PUT, &format!("/bookings/{}/cancel", booking_id), Some(bearer))
            .json(request);
        self.execute(builder).await?;
        Ok(())
    }
}
