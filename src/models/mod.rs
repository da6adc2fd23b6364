pub mod booking;
pub mod movie;
pub mod seat;
pub mod showtime;
pub mod user;

pub use booking::{Booking, BookingConfirmation, BookingSeat, BookingStatus, CreateBookingResponse, SeatLabel};
pub use movie::Movie;
pub use seat::{Seat, SeatStatus};
pub use showtime::Showtime;
pub use user::UserProfile;

pub type SeatId = i64;
pub type ShowtimeId = i64;
pub type BookingId = i64;
pub type MovieId = i64;

/// Бэкенд отдаёт время то с зоной (RFC 3339), то без неё - принимаем оба варианта.
pub(crate) mod datetime {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer};

    fn parse(raw: &str) -> Option<NaiveDateTime> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.naive_utc())
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok())
            .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").ok())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid datetime: {raw}")))
    }

    pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid datetime: {raw}"))),
            None => Ok(None),
        }
    }
}
