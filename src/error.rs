use thiserror::Error;

/// Сообщение по умолчанию, если бэкенд не вернул пригодный `detail`.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Ошибки сессии бронирования, которые видит слой отображения.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    /// Не удалось получить карту мест - сессия не стартует.
    #[error("failed to load seats: {0}")]
    Fetch(String),

    /// Не удалось подписаться на поток статусов мест - сессия не стартует.
    #[error("seat feed unavailable: {0}")]
    Subscribe(String),

    /// Локально обнаруженное нарушение предусловия, в сеть не уходит.
    #[error("{0}")]
    Validation(String),

    #[error("please log in to continue")]
    NotAuthenticated,

    /// Сервер отклонил бронирование (место занято, бронь не найдена и т.п.).
    /// Локальное состояние при этом не меняется.
    #[error("{detail}")]
    Conflict { detail: String },

    #[error("invalid session state: {0}")]
    InvalidState(String),
}

impl BookingError {
    pub fn conflict(detail: impl Into<String>) -> Self {
        BookingError::Conflict { detail: detail.into() }
    }

    /// Можно ли повторить действие в рамках той же сессии.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BookingError::Validation(_) | BookingError::NotAuthenticated | BookingError::Conflict { .. }
        )
    }
}
