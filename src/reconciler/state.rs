use std::collections::{BTreeMap, BTreeSet};
use validator::Validate;

use super::feed_event::{FeedMessage, SeatsUpdated};
use crate::models::{Booking, Seat, SeatId, SeatStatus, ShowtimeId};

/// Режим сессии, фиксирован на всё время жизни сессии.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionMode {
    Create,
    /// Редактирование существующей брони; снимок нужен для проверки владения местами.
    Edit(Booking),
}

impl SessionMode {
    pub fn prior_booking(&self) -> Option<&Booking> {
        match self {
            SessionMode::Create => None,
            SessionMode::Edit(booking) => Some(booking),
        }
    }

    pub fn is_edit(&self) -> bool {
        matches!(self, SessionMode::Edit(_))
    }
}

/// Карта мест сеанса: места по id. Растёт только при загрузке.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeatMap {
    seats: BTreeMap<SeatId, Seat>,
}

impl SeatMap {
    /// Строит карту из ответа сервера; отрицательная цена или повтор id - ошибка.
    pub fn from_seats(seats: Vec<Seat>) -> Result<Self, String> {
        let mut map = BTreeMap::new();
        for seat in seats {
            seat.validate()
                .map_err(|e| format!("seat {} is malformed: {}", seat.id, e))?;
            let id = seat.id;
            if map.insert(id, seat).is_some() {
                return Err(format!("duplicate seat id {}", id));
            }
        }
        Ok(Self { seats: map })
    }

    pub fn get(&self, seat_id: SeatId) -> Option<&Seat> {
        self.seats.get(&seat_id)
    }

    pub fn contains(&self, seat_id: SeatId) -> bool {
        self.seats.contains_key(&seat_id)
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn seats(&self) -> impl Iterator<Item = &Seat> {
        self.seats.values()
    }

    /// Перезаписывает серверный статус у известных мест, возвращает число затронутых.
    pub fn apply_status(&mut self, seat_ids: &[SeatId], status: SeatStatus) -> usize {
        let mut applied = 0;
        for id in seat_ids {
            if let Some(seat) = self.seats.get_mut(id) {
                seat.status = status;
                applied += 1;
            }
        }
        applied
    }

    /// Ряды по алфавиту, места внутри ряда по номеру.
    pub fn rows(&self) -> Vec<(String, Vec<&Seat>)> {
        let mut rows: BTreeMap<&str, Vec<&Seat>> = BTreeMap::new();
        for seat in self.seats.values() {
            rows.entry(seat.row.as_str()).or_default().push(seat);
        }
        rows.into_iter()
            .map(|(row, mut seats)| {
                seats.sort_by_key(|s| s.number);
                (row.to_string(), seats)
            })
            .collect()
    }
}

/// Выбор пользователя. BTreeSet даёт стабильный порядок при отображении.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<SeatId>,
}

impl Selection {
    pub fn contains(&self, seat_id: SeatId) -> bool {
        self.ids.contains(&seat_id)
    }

    /// Возвращает true, если место теперь выбрано.
    pub fn flip(&mut self, seat_id: SeatId) -> bool {
        if self.ids.remove(&seat_id) {
            false
        } else {
            self.ids.insert(seat_id);
            true
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn sorted(&self) -> Vec<SeatId> {
        self.ids.iter().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = SeatId> + '_ {
        self.ids.iter().copied()
    }
}

impl FromIterator<SeatId> for Selection {
    fn from_iter<I: IntoIterator<Item = SeatId>>(iter: I) -> Self {
        Self { ids: iter.into_iter().collect() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Selected,
    Deselected,
    /// Место занято другим пользователем.
    Rejected,
    UnknownSeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    /// Применено; число мест, чей статус перезаписан.
    Applied(usize),
    /// Другой тип сообщения, чужой сеанс или нераспознанный статус.
    Ignored,
    Malformed,
    /// Сессия не принимает сообщения (не открыта или закрыта).
    Inactive,
}

/// Состояние сессии без ввода-вывода: карта мест, выбор и режим.
#[derive(Debug, Clone, PartialEq)]
pub struct SeatState {
    pub showtime_id: ShowtimeId,
    pub mode: SessionMode,
    pub seats: SeatMap,
    pub selection: Selection,
}

impl SeatState {
    pub fn new(showtime_id: ShowtimeId, mode: SessionMode) -> Self {
        Self {
            showtime_id,
            mode,
            seats: SeatMap::default(),
            selection: Selection::default(),
        }
    }

    /// Подставляет загруженную карту; в режиме редактирования предвыбирает места брони.
    pub fn load(&mut self, seats: SeatMap) {
        self.seats = seats;
        self.selection = match &self.mode {
            SessionMode::Create => Selection::default(),
            SessionMode::Edit(booking) => booking.seat_ids().into_iter().collect(),
        };
    }

    /// Место принадлежит редактируемой брони. Вычисляется, не хранится.
    pub fn is_owned(&self, seat_id: SeatId) -> bool {
        self.mode
            .prior_booking()
            .is_some_and(|booking| booking.owns_seat(seat_id))
    }

    pub fn toggle(&mut self, seat_id: SeatId) -> ToggleOutcome {
        let Some(seat) = self.seats.get(seat_id) else {
            return ToggleOutcome::UnknownSeat;
        };

        if seat.status == SeatStatus::Booked && !self.is_owned(seat_id) {
            return ToggleOutcome::Rejected;
        }

        if self.selection.flip(seat_id) {
            ToggleOutcome::Selected
        } else {
            ToggleOutcome::Deselected
        }
    }

    /// Last-write-wins по серверному статусу. Выбор пользователя не трогаем.
    pub fn apply_feed(&mut self, message: &FeedMessage) -> FeedOutcome {
        match message {
            FeedMessage::SeatsUpdated(SeatsUpdated { showtime_id, seat_ids, status }) => {
                if *showtime_id != self.showtime_id {
                    return FeedOutcome::Ignored;
                }
                match status.as_seat_status() {
                    Some(status) => FeedOutcome::Applied(self.seats.apply_status(seat_ids, status)),
                    None => FeedOutcome::Ignored,
                }
            }
            FeedMessage::Ignored => FeedOutcome::Ignored,
        }
    }

    /// Сумма цен выбранных мест; места вне карты считаются бесплатными.
    pub fn total_price(&self) -> f64 {
        self.selection
            .iter()
            .filter_map(|id| self.seats.get(id))
            .map(|seat| seat.price)
            .sum()
    }
}
