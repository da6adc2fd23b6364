//! Сообщения потока статусов мест.
//!
//! ```json
//! { "type": "seats_updated", "showtime_id": 12, "seat_ids": [1, 2], "status": "booked" }
//! ```
//!
//! Любой другой `type` разбирается в `FeedMessage::Ignored`, а не в ошибку.

use serde::Deserialize;

use crate::models::{SeatId, SeatStatus, ShowtimeId};

/// Статус, который может прийти в потоке. Всё, кроме available/booked,
/// оставляет место как есть.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSeatStatus {
    Available,
    Booked,
    #[serde(other)]
    Unrecognized,
}

impl FeedSeatStatus {
    pub fn as_seat_status(self) -> Option<SeatStatus> {
        match self {
            FeedSeatStatus::Available => Some(SeatStatus::Available),
            FeedSeatStatus::Booked => Some(SeatStatus::Booked),
            FeedSeatStatus::Unrecognized => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeatsUpdated {
    pub showtime_id: ShowtimeId,
    pub seat_ids: Vec<SeatId>,
    pub status: FeedSeatStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    SeatsUpdated(SeatsUpdated),
    #[serde(other)]
    Ignored,
}

impl FeedMessage {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
