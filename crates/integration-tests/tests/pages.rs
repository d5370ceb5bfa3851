//! Public pages, bookings, contact messages and reviews.

#![allow(clippy::unwrap_used)]

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use millets_core::Role;
use millets_integration_tests::{TestApp, location};

#[tokio::test]
async fn test_health_checks() {
    let app = TestApp::spawn().await;

    let response = app.get("/health").await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");
    assert_eq!(app.get("/health/ready").await.status(), 200);
}

#[tokio::test]
async fn test_responses_carry_security_headers_and_request_id() {
    let app = TestApp::spawn().await;

    let response = app.get("/").await;
    let headers = response.headers();
    assert!(headers.contains_key("content-security-policy"));
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_home_shows_featured_items_and_categories() {
    let app = TestApp::spawn().await;
    for (name, category) in [
        ("Ragi Dosa", "breakfast"),
        ("Jowar Roti Thali", "meals"),
        ("Foxtail Millet Pongal", "breakfast"),
        ("Bajra Khichdi", "meals"),
        ("Ragi Malt", "drinks"),
    ] {
        app.platform
            .add_menu_item(name, Decimal::new(100, 0), category);
    }

    let home = app.page("/").await;
    assert!(home.contains("Ragi Dosa"));
    assert!(home.contains("Bajra Khichdi"));
    assert!(!home.contains("Ragi Malt"));
    assert!(home.contains("/menu/drinks"));
}

#[tokio::test]
async fn test_menu_filters_by_category() {
    let app = TestApp::spawn().await;
    app.platform
        .add_menu_item("Ragi Dosa", Decimal::new(90, 0), "breakfast");
    app.platform
        .add_menu_item("Ragi Malt", Decimal::new(60, 0), "drinks");

    let all = app.page("/menu").await;
    assert!(all.contains("Ragi Dosa"));
    assert!(all.contains("Ragi Malt"));

    let drinks = app.page("/menu/drinks").await;
    assert!(drinks.contains("Ragi Malt"));
    assert!(!drinks.contains("Ragi Dosa"));

    let order = app.page("/order").await;
    assert!(order.contains("Sign in to order"));
}

#[tokio::test]
async fn test_missing_pages_render_not_found() {
    let app = TestApp::spawn().await;

    for path in ["/order/999", "/order/not-a-number", "/nowhere"] {
        let response = app.get(path).await;
        assert_eq!(response.status(), 404, "{path}");
        assert!(response.text().await.unwrap().contains("couldn't find"));
    }
}

#[tokio::test]
async fn test_reviews_are_posted_and_listed() {
    let app = TestApp::spawn().await;
    let item = app
        .platform
        .add_menu_item("Ragi Dosa", Decimal::new(90, 0), "breakfast");
    let path = format!("/order/{}", item.id);

    let response = app
        .post_form(
            &format!("{path}/reviews"),
            &[("name", "Meera"), ("email", ""), ("message", "Crisp and light!")],
        )
        .await;
    assert_eq!(location(&response), path);

    let response = app
        .post_form(
            &format!("{path}/reviews"),
            &[("name", ""), ("message", "Anonymous")],
        )
        .await;
    assert_eq!(location(&response), path);
    assert_eq!(app.platform.reviews().len(), 1);

    let page = app.page(&path).await;
    assert!(page.contains("Crisp and light!"));
    assert!(page.contains("Review not posted"));
}

#[tokio::test]
async fn test_guest_booking_is_confirmed() {
    let app = TestApp::spawn().await;
    let date = (Utc::now().date_naive() + Duration::days(14))
        .format("%Y-%m-%d")
        .to_string();

    let response = app
        .post_form(
            "/booking",
            &[
                ("name", "Ravi"),
                ("email", "ravi@example.in"),
                ("phone", "9876543210"),
                ("guests", "4"),
                ("date", date.as_str()),
                ("time", "19:30"),
                ("occasion", "birthday"),
                ("confirmation_method", "phone"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/booking-confirmation");

    let bookings = app.platform.bookings();
    assert_eq!(bookings.len(), 1);
    assert!(bookings[0].user_id.is_none());
    assert_eq!(bookings[0].guests, 4);

    let page = app.page("/booking-confirmation").await;
    assert!(page.contains("See you soon, Ravi!"));
}

#[tokio::test]
async fn test_signed_in_booking_is_attached_to_account() {
    let app = TestApp::spawn().await;
    let user = app.add_user("ravi@example.in", Some(Role::Customer));
    app.login("ravi@example.in").await;
    let date = (Utc::now().date_naive() + Duration::days(3))
        .format("%Y-%m-%d")
        .to_string();

    app.post_form(
        "/booking",
        &[
            ("name", "Ravi"),
            ("email", "ravi@example.in"),
            ("phone", "9876543210"),
            ("guests", "2"),
            ("date", date.as_str()),
            ("time", "13:00"),
        ],
    )
    .await;

    assert_eq!(app.platform.bookings()[0].user_id, Some(user));
    let history = app.page("/my-bookings").await;
    assert!(history.contains("13:00"));
}

#[tokio::test]
async fn test_past_booking_is_rejected() {
    let app = TestApp::spawn().await;
    let date = (Utc::now().date_naive() - Duration::days(2))
        .format("%Y-%m-%d")
        .to_string();

    let response = app
        .post_form(
            "/booking",
            &[
                ("name", "Ravi"),
                ("email", "ravi@example.in"),
                ("phone", "9876543210"),
                ("guests", "2"),
                ("date", date.as_str()),
                ("time", "19:30"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/booking");
    assert!(app.platform.bookings().is_empty());

    let form = app.page("/booking").await;
    assert!(form.contains("Date cannot be in the past"));
}

#[tokio::test]
async fn test_contact_message_outcomes() {
    let app = TestApp::spawn().await;
    let message = [
        ("name", "Meera"),
        ("email", "meera@example.in"),
        ("subject", "Catering"),
        ("message", "Do you cater for 50 guests?"),
    ];

    let response = app.post_form("/contact", &message).await;
    assert_eq!(location(&response), "/contact-confirmation?status=success");
    assert_eq!(app.platform.contacts().len(), 1);

    app.platform.fail_writes(true);
    let response = app.post_form("/contact", &message).await;
    assert_eq!(location(&response), "/contact-confirmation?status=error");

    let page = app.page(&location(&response)).await;
    assert!(page.contains("Message not sent"));
    assert!(page.contains("Please try again."));
}

#[tokio::test]
async fn test_contact_confirmation_ignores_query_text() {
    let app = TestApp::spawn().await;

    let page = app
        .page("/contact-confirmation?status=error&message=Call%20555-0100%20to%20claim%20a%20refund")
        .await;
    assert!(page.contains("Message not sent"));
    assert!(!page.contains("claim a refund"));
}

#[tokio::test]
async fn test_profile_is_saved_and_prefills_checkout() {
    let app = TestApp::spawn().await;
    app.add_user("diner@example.in", Some(Role::Customer));
    app.login("diner@example.in").await;
    let item = app
        .platform
        .add_menu_item("Ragi Dosa", Decimal::new(90, 0), "breakfast");

    let response = app
        .post_form(
            "/profile",
            &[
                ("full_name", "Asha Rao"),
                ("phone", "9876543210"),
                ("address", "12 Temple Street, Mysuru"),
                ("pincode", "570001"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/profile");

    let checkout = app
        .page(&format!("/checkout?item_id={}&quantity=1", item.id))
        .await;
    assert!(checkout.contains("12 Temple Street, Mysuru"));
    assert!(checkout.contains("570001"));
}
