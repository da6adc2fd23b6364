//! reconciler
//!
//! Сессия выбора мест одного сеанса. Единственный источник правды о том,
//! какие места есть, в каком они статусе и что выбрал пользователь.
//!
//! Жизненный цикл: `Uninitialized -> Loading -> Open <-> Submitting -> Closed`.
//!
//! 1.  **open**: загрузка карты мест, затем подписка на поток статусов. Поток
//!     читает отдельная задача, сообщения применяются строго по порядку.
//! 2.  **toggle_seat / on_feed_message**: синхронные изменения под блокировкой,
//!     блокировка никогда не удерживается через `.await`.
//! 3.  **commit**: не более одной отправки одновременно. Ответ, пришедший после
//!     `close`, состояние не меняет.

pub mod feed_event;
pub mod state;
pub mod view;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::auth::AuthSession;
use crate::error::BookingError;
use crate::models::{BookingConfirmation, BookingId, SeatId, ShowtimeId};
use crate::services::backend::{
    ApiError, BookingApi, CancelBookingRequest, CreateBookingRequest, UpdateBookingRequest,
};
use crate::services::feed::{FeedConnector, FeedSubscription};

pub use feed_event::{FeedMessage, FeedSeatStatus, SeatsUpdated};
pub use state::{FeedOutcome, SeatMap, SeatState, Selection, SessionMode, ToggleOutcome};
pub use view::{RenderStatus, RowView, SeatMapView, SeatView, SessionPhase, SubmitAction};

/// Результат успешной отправки.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Booked(BookingConfirmation),
    Updated { booking_id: BookingId },
    Cancelled { booking_id: BookingId },
}

/// Что именно уйдёт на сервер при отправке.
#[derive(Debug, Clone, PartialEq)]
enum CommitPlan {
    Create(CreateBookingRequest),
    Update { booking_id: BookingId, request: UpdateBookingRequest },
    Cancel { booking_id: BookingId, request: CancelBookingRequest },
}

impl CommitPlan {
    fn from_state(state: &SeatState) -> Result<Self, BookingError> {
        match state.mode.prior_booking() {
            None if state.selection.is_empty() => Err(BookingError::Validation(
                "Select at least one seat".to_string(),
            )),
            None => Ok(CommitPlan::Create(CreateBookingRequest {
                showtime_id: state.showtime_id,
                seat_ids: state.selection.sorted(),
            })),
            // Пустой выбор в режиме редактирования означает отмену всей брони
            Some(booking) if state.selection.is_empty() => Ok(CommitPlan::Cancel {
                booking_id: booking.id,
                request: CancelBookingRequest { seat_ids: booking.seat_ids() },
            }),
            Some(booking) => Ok(CommitPlan::Update {
                booking_id: booking.id,
                request: UpdateBookingRequest { new_seat_ids: state.selection.sorted() },
            }),
        }
    }
}

struct Inner {
    phase: SessionPhase,
    state: SeatState,
    pump: Option<JoinHandle<()>>,
}

struct Shared {
    api: Arc<dyn BookingApi>,
    feed: Arc<dyn FeedConnector>,
    auth: AuthSession,
    inner: Mutex<Inner>,
    view_tx: watch::Sender<SeatMapView>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &Inner) {
        self.view_tx.send_replace(view::project(&inner.state, inner.phase));
    }

    fn invalid_state(&self, reason: impl Into<String>) -> BookingError {
        let reason = reason.into();
        warn!("Rejected operation: {}", reason);
        BookingError::InvalidState(reason)
    }

    fn ingest(&self, raw: &str) -> FeedOutcome {
        let mut inner = self.lock();
        if !matches!(inner.phase, SessionPhase::Open | SessionPhase::Submitting) {
            debug!("Feed message for inactive session dropped");
            return FeedOutcome::Inactive;
        }

        let message = match FeedMessage::parse(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping malformed feed message: {} ({})", e, raw);
                return FeedOutcome::Malformed;
            }
        };

        let outcome = inner.state.apply_feed(&message);
        match outcome {
            FeedOutcome::Applied(count) => {
                debug!("Feed updated {} seats for showtime {}", count, inner.state.showtime_id);
                self.publish(&inner);
            }
            _ => debug!("Feed message ignored: {:?}", message),
        }
        outcome
    }

    fn close(&self) {
        let mut inner = self.lock();
        if inner.phase == SessionPhase::Closed {
            return;
        }
        inner.phase = SessionPhase::Closed;
        if let Some(pump) = inner.pump.take() {
            pump.abort();
        }
        info!("Seat session for showtime {} closed", inner.state.showtime_id);
        self.publish(&inner);
    }
}

fn spawn_pump(shared: Weak<Shared>, mut subscription: FeedSubscription) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(raw) = subscription.next_message().await {
            let Some(shared) = shared.upgrade() else { break };
            if shared.ingest(&raw) == FeedOutcome::Inactive {
                break;
            }
        }
        debug!("Seat feed pump stopped");
    })
}

/// Возвращает фазу Submitting обратно в Open, если future отправки бросили на полпути.
struct SubmitGuard<'a> {
    shared: &'a Shared,
    armed: bool,
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.shared.lock();
        if inner.phase == SessionPhase::Submitting {
            warn!("Submission dropped before completion");
            inner.phase = SessionPhase::Open;
            self.shared.publish(&inner);
        }
    }
}

/// Сессия выбора мест для одного сеанса.
pub struct SeatReconciler {
    shared: Arc<Shared>,
}

impl SeatReconciler {
    pub fn new(
        showtime_id: ShowtimeId,
        mode: SessionMode,
        api: Arc<dyn BookingApi>,
        feed: Arc<dyn FeedConnector>,
        auth: AuthSession,
    ) -> Self {
        let (view_tx, _) = watch::channel(SeatMapView::empty(showtime_id, SessionPhase::Uninitialized));
        Self {
            shared: Arc::new(Shared {
                api,
                feed,
                auth,
                inner: Mutex::new(Inner {
                    phase: SessionPhase::Uninitialized,
                    state: SeatState::new(showtime_id, mode),
                    pump: None,
                }),
                view_tx,
            }),
        }
    }

    pub fn showtime_id(&self) -> ShowtimeId {
        self.shared.lock().state.showtime_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.shared.lock().phase
    }

    pub fn view(&self) -> SeatMapView {
        let inner = self.shared.lock();
        view::project(&inner.state, inner.phase)
    }

    /// Подписка на модель отображения; обновляется при каждом изменении состояния.
    pub fn watch(&self) -> watch::Receiver<SeatMapView> {
        self.shared.view_tx.subscribe()
    }

    pub fn selection(&self) -> Vec<SeatId> {
        self.shared.lock().state.selection.sorted()
    }

    pub fn total_price(&self) -> f64 {
        self.shared.lock().state.total_price()
    }

    /// Копия текущего состояния.
    pub fn snapshot(&self) -> SeatState {
        self.shared.lock().state.clone()
    }

    /// Загружает карту мест и подписывается на поток статусов.
    ///
    /// При ошибке загрузки или подписки сессия остаётся в `Uninitialized`,
    /// `open` можно вызвать повторно. Если `close` был вызван во время загрузки,
    /// результат отбрасывается без изменения состояния.
    pub async fn open(&self) -> Result<(), BookingError> {
        let showtime_id = {
            let mut inner = self.shared.lock();
            if inner.phase != SessionPhase::Uninitialized {
                return Err(self
                    .shared
                    .invalid_state(format!("cannot open a session in {:?} phase", inner.phase)));
            }
            inner.phase = SessionPhase::Loading;
            self.shared.publish(&inner);
            inner.state.showtime_id
        };

        info!("Opening seat session for showtime {}", showtime_id);

        let fetched = self
            .shared
            .api
            .fetch_seats(showtime_id)
            .await
            .map_err(|e| e.to_string())
            .and_then(SeatMap::from_seats);

        let seats = match fetched {
            Ok(seats) => seats,
            Err(reason) => {
                error!("Failed to load seats for showtime {}: {}", showtime_id, reason);
                return self.abort_open(BookingError::Fetch(reason));
            }
        };

        if self.phase() == SessionPhase::Closed {
            debug!("Seat map for showtime {} arrived after close, discarding", showtime_id);
            return Ok(());
        }

        let subscription = match self.shared.feed.subscribe(showtime_id).await {
            Ok(subscription) => subscription,
            Err(e) => {
                error!("Failed to subscribe to seat feed for showtime {}: {}", showtime_id, e);
                return self.abort_open(BookingError::Subscribe(e.to_string()));
            }
        };

        let mut inner = self.shared.lock();
        if inner.phase == SessionPhase::Closed {
            // Подписка закрывается при drop
            debug!("Seat feed for showtime {} opened after close, discarding", showtime_id);
            return Ok(());
        }

        info!("Loaded {} seats for showtime {}", seats.len(), showtime_id);
        inner.state.load(seats);
        inner.pump = Some(spawn_pump(Arc::downgrade(&self.shared), subscription));
        inner.phase = SessionPhase::Open;
        self.shared.publish(&inner);
        Ok(())
    }

    fn abort_open(&self, err: BookingError) -> Result<(), BookingError> {
        let mut inner = self.shared.lock();
        if inner.phase == SessionPhase::Closed {
            return Ok(());
        }
        inner.phase = SessionPhase::Uninitialized;
        self.shared.publish(&inner);
        Err(err)
    }

    pub fn toggle_seat(&self, seat_id: SeatId) -> Result<ToggleOutcome, BookingError> {
        let mut inner = self.shared.lock();
        if inner.phase != SessionPhase::Open {
            return Err(self
                .shared
                .invalid_state(format!("cannot toggle seats in {:?} phase", inner.phase)));
        }

        let outcome = inner.state.toggle(seat_id);
        match outcome {
            ToggleOutcome::Selected | ToggleOutcome::Deselected => self.shared.publish(&inner),
            ToggleOutcome::Rejected => debug!("Seat {} is booked, toggle rejected", seat_id),
            ToggleOutcome::UnknownSeat => debug!("Seat {} is not on the map", seat_id),
        }
        Ok(outcome)
    }

    /// Применяет сырое сообщение потока. Ошибки разбора логируются и не всплывают.
    pub fn on_feed_message(&self, raw: &str) -> FeedOutcome {
        self.shared.ingest(raw)
    }

    /// Отправляет бронирование, изменение или отмену в зависимости от режима.
    ///
    /// Успех закрывает сессию. При ошибке выбор и карта мест не меняются,
    /// сессия остаётся открытой для повторной попытки.
    pub async fn commit(&self) -> Result<CommitOutcome, BookingError> {
        let (bearer, plan) = {
            let mut inner = self.shared.lock();
            match inner.phase {
                SessionPhase::Open => {}
                SessionPhase::Submitting => {
                    return Err(self.shared.invalid_state("a submission is already in flight"));
                }
                other => {
                    return Err(self
                        .shared
                        .invalid_state(format!("cannot commit in {:?} phase", other)));
                }
            }

            let Some(bearer) = self.shared.auth.bearer() else {
                warn!("Commit attempted without credentials");
                return Err(BookingError::NotAuthenticated);
            };
            let plan = CommitPlan::from_state(&inner.state)?;

            inner.phase = SessionPhase::Submitting;
            self.shared.publish(&inner);
            (bearer, plan)
        };

        let mut guard = SubmitGuard { shared: &self.shared, armed: true };
        let result = self.send(&bearer, plan).await;
        guard.armed = false;

        let mut inner = self.shared.lock();
        if inner.phase == SessionPhase::Closed {
            debug!("Commit response arrived after close, state left untouched");
            return result;
        }

        match &result {
            Ok(outcome) => {
                info!("Seat session committed: {:?}", outcome);
                inner.phase = SessionPhase::Closed;
                if let Some(pump) = inner.pump.take() {
                    pump.abort();
                }
            }
            Err(e) => {
                warn!("Commit failed: {}", e);
                inner.phase = SessionPhase::Open;
            }
        }
        self.shared.publish(&inner);
        result
    }

    async fn send(&self, bearer: &str, plan: CommitPlan) -> Result<CommitOutcome, BookingError> {
        let api = &self.shared.api;
        match plan {
            CommitPlan::Create(request) => api
                .create_booking(bearer, &request)
                .await
                .map(|res| CommitOutcome::Booked(res.into()))
                .map_err(commit_error),
            CommitPlan::Update { booking_id, request } => api
                .update_booking(bearer, booking_id, &request)
                .await
                .map(|_| CommitOutcome::Updated { booking_id })
                .map_err(commit_error),
            CommitPlan::Cancel { booking_id, request } => api
                .cancel_booking(bearer, booking_id, &request)
                .await
                .map(|_| CommitOutcome::Cancelled { booking_id })
                .map_err(commit_error),
        }
    }

    /// Закрывает подписку на поток. Повторный вызов ничего не делает.
    pub fn close(&self) {
        self.shared.close();
    }
}

impl Drop for SeatReconciler {
    fn drop(&mut self) {
        self.shared.close();
    }
}

fn commit_error(err: ApiError) -> BookingError {
    error!("Booking request failed: {}", err);
    match err {
        ApiError::InvalidRequest(e) => BookingError::Validation(e.to_string()),
        other => BookingError::conflict(other.user_message()),
    }
}
