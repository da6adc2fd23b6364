//! Контроллер сессии бронирования.
//!
//! Переводит параметры навигации (id сеанса и, при редактировании, снимок брони)
//! в `SeatReconciler`, а результат отправки - в переход на следующий экран
//! или ошибку, показываемую на месте.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::BookingError;
use crate::models::{Booking, BookingConfirmation, SeatId, ShowtimeId};
use crate::reconciler::{
    CommitOutcome, SeatMapView, SeatReconciler, SessionMode, SubmitAction, ToggleOutcome,
};
use crate::ClientContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteMode {
    Create,
    Edit,
}

/// Состояние, переданное при переходе на экран выбора мест.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationState {
    pub mode: RouteMode,
    pub booking: Option<Booking>,
}

/// Маршрут `/seats/{showtime_id}`.
#[derive(Debug, Clone, PartialEq)]
pub struct SeatRoute {
    pub showtime_id: ShowtimeId,
    pub state: Option<NavigationState>,
}

impl SeatRoute {
    pub fn create(showtime_id: ShowtimeId) -> Self {
        Self { showtime_id, state: None }
    }

    /// Маршрут редактирования существующей брони.
    pub fn edit(booking: Booking) -> Result<Self, BookingError> {
        let showtime_id = booking.showtime_id.ok_or_else(|| {
            BookingError::Validation(
                "Unable to edit: missing showtime ID. Please refresh the page.".to_string(),
            )
        })?;
        Ok(Self {
            showtime_id,
            state: Some(NavigationState { mode: RouteMode::Edit, booking: Some(booking) }),
        })
    }

    /// Определяет режим сессии по состоянию навигации.
    pub fn session_mode(&self) -> Result<SessionMode, BookingError> {
        let Some(NavigationState { mode: RouteMode::Edit, booking }) = &self.state else {
            return Ok(SessionMode::Create);
        };

        let booking = booking
            .clone()
            .ok_or_else(|| BookingError::Validation("No booking to edit".to_string()))?;

        if !booking.is_confirmed() {
            return Err(BookingError::Validation(format!(
                "Booking {} is not confirmed and cannot be edited",
                booking.id
            )));
        }
        if booking.showtime_id.is_some_and(|id| id != self.showtime_id) {
            return Err(BookingError::Validation(format!(
                "Booking {} belongs to another showtime",
                booking.id
            )));
        }
        Ok(SessionMode::Edit(booking))
    }
}

/// Куда перейти после успешной отправки.
#[derive(Debug, Clone, PartialEq)]
pub enum Navigation {
    BookingConfirmation(BookingConfirmation),
    MyBookings { notice: String },
}

pub struct BookingSessionController {
    reconciler: SeatReconciler,
    inline_error: Option<BookingError>,
}

impl BookingSessionController {
    /// Создаёт сессию и загружает карту мест. Ошибка загрузки - экран "не удалось загрузить".
    pub async fn start(ctx: &ClientContext, route: SeatRoute) -> Result<Self, BookingError> {
        let mode = route.session_mode()?;
        info!(
            "Starting {} session for showtime {}",
            if mode.is_edit() { "edit" } else { "booking" },
            route.showtime_id
        );

        let reconciler = SeatReconciler::new(
            route.showtime_id,
            mode,
            ctx.booking_api.clone(),
            ctx.feed.clone(),
            ctx.auth.clone(),
        );
        reconciler.open().await?;

        Ok(Self { reconciler, inline_error: None })
    }

    pub fn reconciler(&self) -> &SeatReconciler {
        &self.reconciler
    }

    pub fn view(&self) -> SeatMapView {
        self.reconciler.view()
    }

    pub fn inline_error(&self) -> Option<&BookingError> {
        self.inline_error.as_ref()
    }

    pub fn toggle_seat(&mut self, seat_id: SeatId) -> Result<ToggleOutcome, BookingError> {
        self.reconciler.toggle_seat(seat_id)
    }

    /// Приводит выбор к заданному набору мест, переключая только разницу.
    /// Возвращает места, чьё состояние не совпало с запрошенным: не удалось
    /// выбрать или не удалось снять (место заняли, пока оно было выбрано).
    pub fn select_exactly(&mut self, seat_ids: &[SeatId]) -> Result<Vec<SeatId>, BookingError> {
        let current = self.reconciler.selection();
        let mut refused = Vec::new();

        for &id in current.iter().filter(|id| !seat_ids.contains(id)) {
            if self.reconciler.toggle_seat(id)? != ToggleOutcome::Deselected {
                warn!("Seat {} could not be released", id);
                refused.push(id);
            }
        }
        for &id in seat_ids.iter().filter(|id| !current.contains(id)) {
            if self.reconciler.toggle_seat(id)? != ToggleOutcome::Selected {
                refused.push(id);
            }
        }
        Ok(refused)
    }

    /// Отправляет выбор. Отмена брони (пустой выбор в режиме редактирования)
    /// выполняется только после подтверждения `confirm_cancel`.
    ///
    /// `Ok(None)` - пользователь отказался от отмены.
    pub async fn submit<F>(&mut self, confirm_cancel: F) -> Result<Option<Navigation>, BookingError>
    where
        F: FnOnce() -> bool,
    {
        if self.reconciler.view().action == SubmitAction::Cancel && !confirm_cancel() {
            info!("Booking cancellation not confirmed");
            return Ok(None);
        }

        match self.reconciler.commit().await {
            Ok(outcome) => {
                self.inline_error = None;
                Ok(Some(match outcome {
                    CommitOutcome::Booked(confirmation) => Navigation::BookingConfirmation(confirmation),
                    CommitOutcome::Updated { .. } => Navigation::MyBookings {
                        notice: "Booking updated successfully!".to_string(),
                    },
                    CommitOutcome::Cancelled { .. } => Navigation::MyBookings {
                        notice: "Booking cancelled successfully!".to_string(),
                    },
                }))
            }
            Err(e) => {
                if e.is_recoverable() {
                    warn!("Submit failed: {}", e);
                } else {
                    error!("Submit refused: {}", e);
                }
                self.inline_error = Some(e.clone());
                Err(e)
            }
        }
    }

    pub fn close(&self) {
        self.reconciler.close();
    }
}
