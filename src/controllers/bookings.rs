use tracing::{error, info, warn};

use crate::auth::AuthSession;
use crate::controllers::booking_session::SeatRoute;
use crate::error::BookingError;
use crate::models::{Booking, BookingId, BookingStatus};
use crate::services::backend::CancelBookingRequest;
use crate::services::{BackendClient, BookingApi};

/// Экран "Мои бронирования": список, отмена и переход к редактированию.
pub struct MyBookingsController {
    backend: BackendClient,
    auth: AuthSession,
    bookings: Vec<Booking>,
}

impl MyBookingsController {
    pub fn new(backend: BackendClient, auth: AuthSession) -> Self {
        Self { backend, auth, bookings: Vec::new() }
    }

    fn bearer(&self) -> Result<String, BookingError> {
        self.auth.bearer().ok_or(BookingError::NotAuthenticated)
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    pub async fn load(&mut self) -> Result<&[Booking], BookingError> {
        let bearer = self.bearer()?;
        self.bookings = self.backend.my_bookings(&bearer).await.map_err(|e| {
            error!("Error fetching bookings: {}", e);
            BookingError::Fetch(e.user_message())
        })?;
        info!("Loaded {} bookings", self.bookings.len());
        Ok(&self.bookings)
    }

    pub async fn booking(&self, booking_id: BookingId) -> Result<Booking, BookingError> {
        let bearer = self.bearer()?;
        self.backend
            .booking(&bearer, booking_id)
            .await
            .map_err(|e| BookingError::Fetch(e.user_message()))
    }

    /// Отменяет бронь целиком и помечает её отменённой в локальном списке.
    pub async fn cancel(&mut self, booking_id: BookingId) -> Result<(), BookingError> {
        let bearer = self.bearer()?;
        let booking = self
            .bookings
            .iter()
            .find(|b| b.id == booking_id)
            .ok_or_else(|| BookingError::Validation(format!("Booking {} is not in the list", booking_id)))?;

        if !booking.is_confirmed() {
            return Err(BookingError::Validation(format!(
                "Booking {} is already {:?}",
                booking_id, booking.status
            )));
        }

        let request = CancelBookingRequest { seat_ids: booking.seat_ids() };
        self.backend
            .cancel_booking(&bearer, booking_id, &request)
            .await
            .map_err(|e| {
                warn!("Error cancelling booking {}: {}", booking_id, e);
                BookingError::conflict(e.user_message())
            })?;

        for booking in self.bookings.iter_mut().filter(|b| b.id == booking_id) {
            booking.status = BookingStatus::Cancelled;
        }
        info!("Booking {} cancelled", booking_id);
        Ok(())
    }

    /// Маршрут на экран выбора мест в режиме редактирования.
    pub fn edit_route(&self, booking_id: BookingId) -> Result<SeatRoute, BookingError> {
        let booking = self
            .bookings
            .iter()
            .find(|b| b.id == booking_id)
            .ok_or_else(|| BookingError::Validation(format!("Booking {} is not in the list", booking_id)))?;

        if !booking.is_confirmed() {
            return Err(BookingError::Validation(format!(
                "Booking {} cannot be edited",
                booking_id
            )));
        }
        SeatRoute::edit(booking.clone())
    }
}
