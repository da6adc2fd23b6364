use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{MovieId, ShowtimeId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Showtime {
    pub id: ShowtimeId,
    #[serde(default)]
    pub movie_id: Option<MovieId>,
    #[serde(default)]
    pub hall: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(deserialize_with = "super::datetime::deserialize")]
    pub start_time: NaiveDateTime,
}

impl Showtime {
    pub fn hall_name(&self) -> &str {
        self.hall.as_deref().unwrap_or("Main Theater")
    }
}
