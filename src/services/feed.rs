//! Подписка на WebSocket-поток статусов мест одного сеанса.
//!
//! Соединение читается отдельной задачей, которая пересылает текстовые кадры
//! в канал. Подписка владеет этой задачей: при `drop` задача прерывается,
//! и соединение закрывается.

use async_trait::async_trait;
use futures::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::models::ShowtimeId;

const FEED_BUFFER: usize = 256;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("websocket connect failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Открытая подписка на поток сообщений. Сообщения приходят в порядке доставки.
pub struct FeedSubscription {
    messages: mpsc::Receiver<String>,
    reader: Option<JoinHandle<()>>,
}

impl FeedSubscription {
    pub fn new(messages: mpsc::Receiver<String>, reader: JoinHandle<()>) -> Self {
        Self { messages, reader: Some(reader) }
    }

    /// Подписка поверх готового канала, без собственной задачи чтения.
    pub fn from_channel(messages: mpsc::Receiver<String>) -> Self {
        Self { messages, reader: None }
    }

    /// Следующее сырое сообщение; `None`, когда поток закрыт.
    pub async fn next_message(&mut self) -> Option<String> {
        self.messages.recv().await
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

#[async_trait]
pub trait FeedConnector: Send + Sync {
    async fn subscribe(&self, showtime_id: ShowtimeId) -> Result<FeedSubscription, FeedError>;
}

/// Подключение к `{ws_url}/ws/showtime/{id}`.
#[derive(Debug, Clone)]
pub struct WsFeedConnector {
    ws_url: String,
}

impl WsFeedConnector {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self { ws_url: ws_url.into().trim_end_matches('/').to_string() }
    }

    pub fn showtime_url(&self, showtime_id: ShowtimeId) -> String {
        format!("{}/ws/showtime/{}", self.ws_url, showtime_id)
    }
}

#[async_trait]
impl FeedConnector for WsFeedConnector {
    async fn subscribe(&self, showtime_id: ShowtimeId) -> Result<FeedSubscription, FeedError> {
        let url = self.showtime_url(showtime_id);
        let (stream, _) = connect_async(url.as_str()).await?;
        info!("WebSocket connected: {}", url);

        let (tx, rx) = mpsc::channel(FEED_BUFFER);
        let reader = tokio::spawn(async move {
            let mut incoming = stream;
            while let Some(frame) = incoming.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if tx.send(text).await.is_err() {
                            // Получатель закрыт - сессия завершена
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(other) => debug!("Ignoring non-text frame: {:?}", other),
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
            warn!("WebSocket closed for showtime {}", showtime_id);
        });

        Ok(FeedSubscription::new(rx, reader))
    }
}
