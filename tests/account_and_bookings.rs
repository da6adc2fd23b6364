mod common;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use booking_client::auth::AuthSession;
use booking_client::config::Config;
use booking_client::controllers::{AccountController, CatalogController, MovieSection, MyBookingsController, RouteMode};
use booking_client::error::BookingError;
use booking_client::models::BookingStatus;
use booking_client::services::{ApiError, BackendClient};
use common::valid_token;

fn backend(server: &MockServer) -> BackendClient {
    BackendClient::from_config(&Config::with_urls(server.uri(), "ws://unused")).unwrap()
}

fn booking_json(id: i64, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "showtime_id": 7,
        "movie_title": "Dune",
        "showtime": "2025-11-02T18:30:00",
        "seats": [{"seat_id": 1, "row": "A", "number": 1}, {"seat_id": 2, "row": "A", "number": 2}],
        "total_amount": 300.0,
        "status": status
    })
}

#[tokio::test]
async fn login_stores_token_and_profile() {
    let server = MockServer::start().await;
    let token = valid_token();
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": token})))
        .mount(&server)
        .await;

    let auth = AuthSession::new();
    let account = AccountController::new(backend(&server), auth.clone());
    let user = account.login("ann@example.com", "secret").await.unwrap();

    assert_eq!(user.name.as_deref(), Some("ann"));
    assert_eq!(account.token(), Some(token));
    assert!(auth.is_authenticated());

    account.logout();
    assert!(!auth.is_authenticated());
}

#[tokio::test]
async fn login_without_token_is_not_stored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token_type": "bearer"})))
        .mount(&server)
        .await;

    let auth = AuthSession::new();
    let account = AccountController::new(backend(&server), auth.clone());

    assert!(matches!(
        account.login("ann@example.com", "secret").await,
        Err(ApiError::Malformed(_))
    ));
    assert!(auth.user().is_none());
}

#[tokio::test]
async fn cancel_from_list_marks_booking_cancelled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bookings/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            booking_json(1, "confirmed"),
            booking_json(2, "cancelled"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/bookings/1/cancel"))
        .and(body_json(json!({"seat_ids": [1, 2]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let token = valid_token();
    Mock::given(method("GET"))
        .and(path("/bookings/1"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(booking_json(1, "confirmed")))
        .mount(&server)
        .await;

    let mut bookings = MyBookingsController::new(backend(&server), AuthSession::with_token(token));
    assert_eq!(bookings.booking(1).await.unwrap().seat_ids(), vec![1, 2]);
    assert_eq!(bookings.load().await.unwrap().len(), 2);

    bookings.cancel(1).await.unwrap();
    assert_eq!(bookings.bookings()[0].status, BookingStatus::Cancelled);

    // Отменённую бронь нельзя ни отменить повторно, ни редактировать
    assert!(matches!(bookings.cancel(2).await, Err(BookingError::Validation(_))));
    assert!(matches!(bookings.edit_route(1), Err(BookingError::Validation(_))));
}

#[tokio::test]
async fn edit_route_from_list_carries_booking() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bookings/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([booking_json(5, "confirmed")])))
        .mount(&server)
        .await;

    let mut bookings = MyBookingsController::new(backend(&server), AuthSession::with_token(valid_token()));
    bookings.load().await.unwrap();

    let route = bookings.edit_route(5).unwrap();
    assert_eq!(route.showtime_id, 7);
    let state = route.state.unwrap();
    assert_eq!(state.mode, RouteMode::Edit);
    assert_eq!(state.booking.unwrap().id, 5);
}

#[tokio::test]
async fn bookings_require_login() {
    let server = MockServer::start().await;
    let mut bookings = MyBookingsController::new(backend(&server), AuthSession::new());

    assert!(matches!(bookings.load().await, Err(BookingError::NotAuthenticated)));
}

#[tokio::test]
async fn catalog_search_and_pagination() {
    let server = MockServer::start().await;
    let movies: Vec<_> = (1..=6)
        .map(|i| json!({"id": i, "title": format!("Star Story {}", i), "rating": 8.0}))
        .chain([json!({"id": 7, "title": "Heat", "description": "A heist"})])
        .collect();
    Mock::given(method("GET"))
        .and(path("/movie/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(movies)))
        .mount(&server)
        .await;

    let catalog = CatalogController::new(backend(&server));
    let page = catalog.browse(MovieSection::All, "star", 2).await.unwrap();

    assert_eq!(page.total_matches, 6);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.movies.iter().map(|m| m.id).collect::<Vec<_>>(), vec![5, 6]);

    let heist = catalog.browse(MovieSection::All, "HEIST", 1).await.unwrap();
    assert_eq!(heist.movies.len(), 1);
}
