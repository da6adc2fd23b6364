use serde::{Deserialize, Serialize};
use validator::Validate;

use super::SeatId;

/// Статус места, как его сообщает сервер. "Выбрано" сюда не входит:
/// выбор живёт только на клиенте.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    Available,
    Booked,
    Locked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Seat {
    pub id: SeatId,
    #[validate(length(min = 1))]
    pub row: String,
    pub number: i32,
    #[validate(range(min = 0.0))]
    pub price: f64,
    pub status: SeatStatus,
}

impl Seat {
    /// Подпись места для отображения, например "A7".
    pub fn label(&self) -> String {
        format!("{}{}", self.row, self.number)
    }
}
