use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{BookingId, SeatId, ShowtimeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingSeat {
    pub seat_id: SeatId,
    pub row: String,
    pub number: i32,
}

/// Снимок бронирования, которым владеет бэкенд. Клиент его только читает.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    #[serde(default)]
    pub showtime_id: Option<ShowtimeId>,
    #[serde(default)]
    pub movie_title: Option<String>,
    #[serde(default, deserialize_with = "super::datetime::deserialize_opt")]
    pub showtime: Option<NaiveDateTime>,
    #[serde(default)]
    pub seats: Vec<BookingSeat>,
    #[serde(default)]
    pub total_amount: f64,
    pub status: BookingStatus,
}

impl Booking {
    pub fn seat_ids(&self) -> Vec<SeatId> {
        self.seats.iter().map(|s| s.seat_id).collect()
    }

    pub fn owns_seat(&self, seat_id: SeatId) -> bool {
        self.seats.iter().any(|s| s.seat_id == seat_id)
    }

    pub fn seat_labels(&self) -> Vec<String> {
        self.seats.iter().map(|s| format!("{}{}", s.row, s.number)).collect()
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatLabel {
    pub row: String,
    pub number: i32,
}

// Ответ POST /bookings
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingResponse {
    pub booking_id: BookingId,
    #[serde(default)]
    pub movie_title: Option<String>,
    #[serde(default)]
    pub hall: Option<String>,
    #[serde(default, deserialize_with = "super::datetime::deserialize_opt")]
    pub showtime: Option<NaiveDateTime>,
    #[serde(default)]
    pub seats: Vec<SeatLabel>,
    #[serde(default)]
    pub total_amount: Option<f64>,
}

/// Данные для экрана подтверждения бронирования.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingConfirmation {
    pub booking_id: BookingId,
    pub movie: String,
    pub hall: String,
    pub showtime: Option<NaiveDateTime>,
    pub seats: Vec<String>,
    pub total_amount: f64,
}

impl From<CreateBookingResponse> for BookingConfirmation {
    fn from(res: CreateBookingResponse) -> Self {
        Self {
            booking_id: res.booking_id,
            movie: res.movie_title.unwrap_or_else(|| "Unknown Movie".to_string()),
            hall: res.hall.unwrap_or_else(|| "Main Hall".to_string()),
            showtime: res.showtime,
            seats: res
                .seats
                .into_iter()
                .map(|s| format!("{}{}", s.row, s.number))
                .collect(),
            total_amount: res.total_amount.unwrap_or(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_falls_back_to_defaults() {
        let res: CreateBookingResponse = serde_json::from_value(serde_json::json!({
            "booking_id": 42,
            "seats": [{"row": "B", "number": 3}, {"row": "B", "number": 4}]
        }))
        .unwrap();

        let confirmation = BookingConfirmation::from(res);
        assert_eq!(confirmation.booking_id, 42);
        assert_eq!(confirmation.movie, "Unknown Movie");
        assert_eq!(confirmation.hall, "Main Hall");
        assert_eq!(confirmation.seats, vec!["B3", "B4"]);
        assert_eq!(confirmation.total_amount, 0.0);
    }

    #[test]
    fn booking_accepts_naive_and_zoned_showtimes() {
        let naive: Booking = serde_json::from_value(serde_json::json!({
            "id": 1, "showtime": "2025-11-02T18:30:00", "status": "confirmed"
        }))
        .unwrap();
        let zoned: Booking = serde_json::from_value(serde_json::json!({
            "id": 2, "showtime": "2025-11-02T18:30:00Z", "status": "cancelled"
        }))
        .unwrap();

        assert_eq!(naive.showtime, zoned.showtime);
        assert!(naive.is_confirmed());
        assert_eq!(zoned.status, BookingStatus::Cancelled);
    }
}
