pub mod backend;
pub mod circuit_breaker;
pub mod feed;

pub use backend::{ApiError, BackendClient, BookingApi};
pub use feed::{FeedConnector, FeedError, FeedSubscription, WsFeedConnector};
