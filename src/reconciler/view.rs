//! Проекция состояния сессии в модель для отрисовки.
//!
//! Серверный статус и выбор пользователя - два независимых поля; итоговый
//! статус места вычисляется только здесь.

use serde::Serialize;

use super::state::SeatState;
use crate::models::{Seat, SeatId, SeatStatus, ShowtimeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStatus {
    Available,
    Selected,
    Booked,
    Locked,
}

/// Фаза жизненного цикла сессии.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Uninitialized,
    Loading,
    Open,
    Submitting,
    Closed,
}

impl SessionPhase {
    pub fn is_pending(self) -> bool {
        matches!(self, SessionPhase::Loading | SessionPhase::Submitting)
    }
}

/// Что сделает кнопка отправки.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubmitAction {
    Book,
    Update,
    Cancel,
}

impl SubmitAction {
    pub fn label(self) -> &'static str {
        match self {
            SubmitAction::Book => "Book Now",
            SubmitAction::Update => "Update Booking",
            SubmitAction::Cancel => "Cancel Booking",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeatView {
    pub id: SeatId,
    pub label: String,
    pub price: f64,
    pub status: RenderStatus,
    pub selectable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowView {
    pub row: String,
    pub seats: Vec<SeatView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeatMapView {
    pub showtime_id: ShowtimeId,
    pub phase: SessionPhase,
    pub edit_mode: bool,
    pub rows: Vec<RowView>,
    /// Ширина самого длинного ряда, для выравнивания сетки.
    pub max_cols: usize,
    pub selected: Vec<SeatId>,
    pub selected_labels: Vec<String>,
    /// Места редактируемой брони в том виде, в каком она была подтверждена.
    pub current_booking: Vec<String>,
    pub total_price: f64,
    pub action: SubmitAction,
}

impl SeatMapView {
    pub fn empty(showtime_id: ShowtimeId, phase: SessionPhase) -> Self {
        Self {
            showtime_id,
            phase,
            edit_mode: false,
            rows: Vec::new(),
            max_cols: 0,
            selected: Vec::new(),
            selected_labels: Vec::new(),
            current_booking: Vec::new(),
            total_price: 0.0,
            action: SubmitAction::Book,
        }
    }

    pub fn seat(&self, seat_id: SeatId) -> Option<&SeatView> {
        self.rows.iter().flat_map(|r| r.seats.iter()).find(|s| s.id == seat_id)
    }
}

/// Итоговый статус места для отрисовки.
pub fn render_status(seat: &Seat, selected: bool, owned: bool) -> RenderStatus {
    match seat.status {
        SeatStatus::Booked if !owned => RenderStatus::Booked,
        _ if selected => RenderStatus::Selected,
        SeatStatus::Locked => RenderStatus::Locked,
        _ => RenderStatus::Available,
    }
}

pub fn project(state: &SeatState, phase: SessionPhase) -> SeatMapView {
    let rows: Vec<RowView> = state
        .seats
        .rows()
        .into_iter()
        .map(|(row, seats)| RowView {
            row,
            seats: seats
                .into_iter()
                .map(|seat| {
                    let status =
                        render_status(seat, state.selection.contains(seat.id), state.is_owned(seat.id));
                    SeatView {
                        id: seat.id,
                        label: seat.label(),
                        price: seat.price,
                        status,
                        selectable: matches!(status, RenderStatus::Available | RenderStatus::Selected),
                    }
                })
                .collect(),
        })
        .collect();

    let selected = state.selection.sorted();
    let selected_labels = selected
        .iter()
        .filter_map(|&id| state.seats.get(id).map(Seat::label))
        .collect();

    let action = match (state.mode.prior_booking(), state.selection.is_empty()) {
        (None, _) => SubmitAction::Book,
        (Some(_), true) => SubmitAction::Cancel,
        (Some(_), false) => SubmitAction::Update,
    };

    SeatMapView {
        showtime_id: state.showtime_id,
        phase,
        edit_mode: state.mode.is_edit(),
        max_cols: rows.iter().map(|r| r.seats.len()).max().unwrap_or(0),
        rows,
        selected,
        selected_labels,
        current_booking: state
            .mode
            .prior_booking()
            .map(|b| b.seat_labels())
            .unwrap_or_default(),
        total_price: state.total_price(),
        action,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Booking, BookingSeat, BookingStatus};
    use crate::reconciler::state::{SeatMap, SessionMode};

    fn seat(id: SeatId, number: i32, price: f64, status: SeatStatus) -> Seat {
        Seat { id, row: "A".to_string(), number, price, status }
    }

    #[test]
    fn booked_beats_selection_unless_owned() {
        let booked = seat(1, 1, 100.0, SeatStatus::Booked);
        assert_eq!(render_status(&booked, true, false), RenderStatus::Booked);
        assert_eq!(render_status(&booked, true, true), RenderStatus::Selected);
        assert_eq!(render_status(&booked, false, true), RenderStatus::Available);
    }

    #[test]
    fn locked_passes_through() {
        let locked = seat(1, 1, 100.0, SeatStatus::Locked);
        assert_eq!(render_status(&locked, false, false), RenderStatus::Locked);
    }

    #[test]
    fn edit_view_reports_cancel_when_nothing_selected() {
        let booking = Booking {
            id: 3,
            showtime_id: Some(1),
            movie_title: None,
            showtime: None,
            seats: vec![BookingSeat { seat_id: 2, row: "A".to_string(), number: 2 }],
            total_amount: 90.0,
            status: BookingStatus::Confirmed,
        };
        let mut state = SeatState::new(1, SessionMode::Edit(booking));
        state.load(
            SeatMap::from_seats(vec![
                seat(1, 1, 90.0, SeatStatus::Available),
                seat(2, 2, 90.0, SeatStatus::Booked),
            ])
            .unwrap(),
        );

        let view = project(&state, SessionPhase::Open);
        assert_eq!(view.action, SubmitAction::Update);
        assert_eq!(view.current_booking, vec!["A2"]);
        assert_eq!(view.seat(2).unwrap().status, RenderStatus::Selected);

        state.toggle(2);
        let view = project(&state, SessionPhase::Open);
        assert_eq!(view.action, SubmitAction::Cancel);
        assert_eq!(view.total_price, 0.0);
        assert_eq!(view.seat(2).unwrap().status, RenderStatus::Available);
        assert!(view.seat(2).unwrap().selectable);
    }

    #[test]
    fn max_cols_tracks_widest_row() {
        let mut state = SeatState::new(1, SessionMode::Create);
        state.load(
            SeatMap::from_seats(vec![
                seat(1, 1, 10.0, SeatStatus::Available),
                seat(2, 2, 10.0, SeatStatus::Available),
                Seat { id: 3, row: "B".to_string(), number: 1, price: 10.0, status: SeatStatus::Available },
            ])
            .unwrap(),
        );
        let view = project(&state, SessionPhase::Open);
        assert_eq!(view.max_cols, 2);
        assert_eq!(view.rows.len(), 2);
    }
}
