pub mod account;
pub mod booking_session;
pub mod bookings;
pub mod catalog;

pub use account::AccountController;
pub use booking_session::{BookingSessionController, Navigation, NavigationState, RouteMode, SeatRoute};
pub use bookings::MyBookingsController;
pub use catalog::{CatalogController, MoviePage, MovieSection};
