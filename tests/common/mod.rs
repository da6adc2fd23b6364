#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

use booking_client::auth::AuthSession;
use booking_client::models::{
    Booking, BookingId, BookingSeat, BookingStatus, CreateBookingResponse, Seat, SeatId,
    SeatStatus, ShowtimeId,
};
use booking_client::reconciler::{SeatReconciler, SessionMode};
use booking_client::services::backend::{
    ApiError, BookingApi, CancelBookingRequest, CreateBookingRequest, UpdateBookingRequest,
};
use booking_client::services::{FeedConnector, FeedError, FeedSubscription};

pub const SHOWTIME: ShowtimeId = 1;

#[derive(Serialize)]
struct Claims {
    sub: String,
    exp: i64,
}

pub fn valid_token() -> String {
    let claims = Claims { sub: "user@example.com".to_string(), exp: Utc::now().timestamp() + 3600 };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"server-secret")).unwrap()
}

pub fn logged_in() -> AuthSession {
    AuthSession::with_token(valid_token())
}

pub fn seat(id: SeatId, row: &str, number: i32, price: f64, status: SeatStatus) -> Seat {
    Seat { id, row: row.to_string(), number, price, status }
}

/// Зал 2x3: A1-A3 (id 1-3) по 150, B1-B3 (id 4-6) по 200.
/// A3 (id 3) занято, B3 (id 6) заблокировано.
pub fn small_hall() -> Vec<Seat> {
    vec![
        seat(1, "A", 1, 150.0, SeatStatus::Available),
        seat(2, "A", 2, 150.0, SeatStatus::Available),
        seat(3, "A", 3, 150.0, SeatStatus::Booked),
        seat(4, "B", 1, 200.0, SeatStatus::Available),
        seat(5, "B", 2, 200.0, SeatStatus::Available),
        seat(6, "B", 3, 200.0, SeatStatus::Locked),
    ]
}

pub fn confirmed_booking(id: BookingId, seats: &[(SeatId, &str, i32)]) -> Booking {
    Booking {
        id,
        showtime_id: Some(SHOWTIME),
        movie_title: Some("Dune".to_string()),
        showtime: None,
        seats: seats
            .iter()
            .map(|&(seat_id, row, number)| BookingSeat { seat_id, row: row.to_string(), number })
            .collect(),
        total_amount: 150.0 * seats.len() as f64,
        status: BookingStatus::Confirmed,
    }
}

pub fn seats_updated(showtime_id: ShowtimeId, seat_ids: &[SeatId], status: &str) -> String {
    serde_json::json!({
        "type": "seats_updated",
        "showtime_id": showtime_id,
        "seat_ids": seat_ids,
        "status": status,
    })
    .to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Fetch(ShowtimeId),
    Create { bearer: String, request: CreateBookingRequest },
    Update { booking_id: BookingId, request: UpdateBookingRequest },
    Cancel { booking_id: BookingId, request: CancelBookingRequest },
}

/// Бэкенд в памяти: записывает вызовы, умеет отказывать и задерживать ответы.
#[derive(Default)]
pub struct FakeApi {
    seats: Mutex<Vec<Seat>>,
    fail_fetch: AtomicBool,
    reject_with: Mutex<Option<String>>,
    fetch_gate: Mutex<Option<oneshot::Receiver<()>>>,
    commit_gate: Mutex<Option<oneshot::Receiver<()>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeApi {
    pub fn with_seats(seats: Vec<Seat>) -> Arc<Self> {
        Arc::new(Self { seats: Mutex::new(seats), ..Self::default() })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn reject_commits_with(&self, detail: &str) {
        *self.reject_with.lock().unwrap() = Some(detail.to_string());
    }

    /// Следующая загрузка мест ждёт, пока не отпустят возвращённый Sender.
    pub fn hold_fetch(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.fetch_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn hold_commit(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.commit_gate.lock().unwrap() = Some(rx);
        tx
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn pass(gate: &Mutex<Option<oneshot::Receiver<()>>>) {
        let gate = gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
    }

    fn rejection(&self) -> Result<(), ApiError> {
        match self.reject_with.lock().unwrap().clone() {
            Some(detail) => Err(ApiError::Rejected { status: 400, detail }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BookingApi for FakeApi {
    async fn fetch_seats(&self, showtime_id: ShowtimeId) -> Result<Vec<Seat>, ApiError> {
        self.record(Call::Fetch(showtime_id));
        Self::pass(&self.fetch_gate).await;
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(ApiError::Rejected { status: 500, detail: "boom".to_string() });
        }
        Ok(self.seats.lock().unwrap().clone())
    }

    async fn create_booking(
        &self,
        bearer: &str,
        request: &CreateBookingRequest,
    ) -> Result<CreateBookingResponse, ApiError> {
        self.record(Call::Create { bearer: bearer.to_string(), request: request.clone() });
        Self::pass(&self.commit_gate).await;
        self.rejection()?;

        let seats = self.seats.lock().unwrap().clone();
        let labels: Vec<_> = seats
            .iter()
            .filter(|s| request.seat_ids.contains(&s.id))
            .map(|s| serde_json::json!({"row": s.row, "number": s.number}))
            .collect();
        let total: f64 = seats.iter().filter(|s| request.seat_ids.contains(&s.id)).map(|s| s.price).sum();

        Ok(serde_json::from_value(serde_json::json!({
            "booking_id": 77,
            "movie_title": "Dune",
            "hall": "Hall 2",
            "showtime": "2025-11-02T18:30:00",
            "seats": labels,
            "total_amount": total,
        }))
        .unwrap())
    }

    async fn update_booking(
        &self,
        _bearer: &str,
        booking_id: BookingId,
        request: &UpdateBookingRequest,
    ) -> Result<(), ApiError> {
        self.record(Call::Update { booking_id, request: request.clone() });
        Self::pass(&self.commit_gate).await;
        self.rejection()
    }

    async fn cancel_booking(
        &self,
        _bearer: &str,
        booking_id: BookingId,
        request: &CancelBookingRequest,
    ) -> Result<(), ApiError> {
        self.record(Call::Cancel { booking_id, request: request.clone() });
        Self::pass(&self.commit_gate).await;
        self.rejection()
    }
}

/// Поток статусов на каналах: тест пишет в Sender последней подписки.
#[derive(Default)]
pub struct FakeFeed {
    senders: Mutex<Vec<mpsc::Sender<String>>>,
    subscriptions: AtomicUsize,
    fail: AtomicBool,
}

impl FakeFeed {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let feed = Self::default();
        feed.fail.store(true, Ordering::SeqCst);
        Arc::new(feed)
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    pub fn sender(&self) -> mpsc::Sender<String> {
        self.senders.lock().unwrap().last().cloned().expect("no subscription yet")
    }
}

#[async_trait]
impl FeedConnector for FakeFeed {
    async fn subscribe(&self, _showtime_id: ShowtimeId) -> Result<FeedSubscription, FeedError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(FeedError::Connect(tokio_tungstenite::tungstenite::Error::ConnectionClosed));
        }
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(16);
        self.senders.lock().unwrap().push(tx);
        Ok(FeedSubscription::from_channel(rx))
    }
}

pub fn reconciler(
    mode: SessionMode,
    api: &Arc<FakeApi>,
    feed: &Arc<FakeFeed>,
    auth: AuthSession,
) -> SeatReconciler {
    SeatReconciler::new(SHOWTIME, mode, api.clone(), feed.clone(), auth)
}
