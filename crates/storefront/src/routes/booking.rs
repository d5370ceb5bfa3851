//! Table booking route handlers.
//!
//! Booking is open to guests; a signed-in user's booking is attached to
//! their account so it shows under "My bookings".

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use millets_core::{BookingStatus, ConfirmationMethod, Email, UserId};

use crate::filters;
use crate::middleware::{OptionalAuth, PageContext};
use crate::models::{Flash, session_keys};
use crate::platform::NewBooking;
use crate::state::AppState;

/// Largest party accepted online.
const MAX_GUESTS: u32 = 20;

/// Booking form template.
#[derive(Template, WebTemplate)]
#[template(path = "booking.html")]
pub struct BookingTemplate {
    pub ctx: PageContext,
    pub email: String,
    pub today: String,
}

/// Booking form data as submitted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BookingForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub guests: String,
    pub date: String,
    pub time: String,
    pub occasion: String,
    pub table_preference: String,
    pub special_requests: String,
    pub confirmation_method: String,
}

fn required<'a>(value: &'a str, label: &str) -> Result<&'a str, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{label} is required"));
    }
    Ok(value)
}

impl BookingForm {
    /// Validate the form against `today`.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first problem.
    pub fn validate(&self, user_id: Option<UserId>, today: NaiveDate) -> Result<NewBooking, String> {
        let name = required(&self.name, "Name")?;
        let email = Email::parse(required(&self.email, "Email")?).map_err(|e| format!("Email: {e}"))?;
        let phone = required(&self.phone, "Phone")?;

        let guests = self
            .guests
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|g| (1..=MAX_GUESTS).contains(g))
            .ok_or_else(|| format!("Guests must be between 1 and {MAX_GUESTS}"))?;

        let date = NaiveDate::parse_from_str(required(&self.date, "Date")?, "%Y-%m-%d")
            .map_err(|_| "Date is not valid".to_string())?;
        if date < today {
            return Err("Date cannot be in the past".to_string());
        }

        let time_raw = required(&self.time, "Time")?;
        let time = NaiveTime::parse_from_str(time_raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(time_raw, "%H:%M:%S"))
            .map_err(|_| "Time is not valid".to_string())?;

        let confirmation_method = match self.confirmation_method.trim() {
            "" => ConfirmationMethod::default(),
            raw => raw.parse()?,
        };

        Ok(NewBooking {
            user_id,
            name: name.to_string(),
            email,
            phone: phone.to_string(),
            guests,
            date,
            time,
            occasion: self.occasion.trim().to_string(),
            table_preference: self.table_preference.trim().to_string(),
            special_requests: self.special_requests.trim().to_string(),
            confirmation_method,
            status: BookingStatus::Pending,
        })
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Display the booking form.
#[instrument(skip_all)]
pub async fn show(OptionalAuth(user): OptionalAuth, ctx: PageContext) -> impl IntoResponse {
    BookingTemplate {
        ctx,
        email: user.map(|u| u.email).unwrap_or_default(),
        today: today().format("%Y-%m-%d").to_string(),
    }
}

/// Create a booking.
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Form(form): Form<BookingForm>,
) -> Response {
    let booking = match form.validate(user.map(|u| u.id), today()) {
        Ok(booking) => booking,
        Err(message) => {
            Flash::error("Please check your booking", message)
                .set(&session)
                .await;
            return Redirect::to("/booking").into_response();
        }
    };

    match state.platform().create_booking(&booking).await {
        Ok(stored) => {
            info!(booking_id = %stored.id, guests = stored.guests, "Table booked");
            if let Err(e) = session.insert(session_keys::LAST_BOOKING, stored.id).await {
                warn!(error = %e, "Failed to remember booking in session");
            }
            Flash::success("Table booked!", "We look forward to seeing you.")
                .set(&session)
                .await;
            Redirect::to("/booking-confirmation").into_response()
        }
        Err(e) => {
            warn!(error = %e, "Failed to create booking");
            Flash::error("Booking failed", "Something went wrong. Please try again.")
                .set(&session)
                .await;
            Redirect::to("/booking").into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> BookingForm {
        BookingForm {
            name: "Ravi".to_string(),
            email: "Ravi@Example.in".to_string(),
            phone: "9876543210".to_string(),
            guests: "4".to_string(),
            date: "2026-12-24".to_string(),
            time: "19:30".to_string(),
            ..BookingForm::default()
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_valid_booking() {
        let booking = form().validate(None, day("2026-12-01")).unwrap();
        assert_eq!(booking.email.as_str(), "ravi@example.in");
        assert_eq!(booking.guests, 4);
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.confirmation_method, ConfirmationMethod::Email);
    }

    #[test]
    fn test_past_date_is_rejected() {
        let err = form().validate(None, day("2027-01-01")).unwrap_err();
        assert_eq!(err, "Date cannot be in the past");
        assert!(form().validate(None, day("2026-12-24")).is_ok());
    }

    #[test]
    fn test_guests_must_be_positive() {
        let mut form = form();
        form.guests = "0".to_string();
        assert!(form.validate(None, day("2026-12-01")).is_err());
    }

    #[test]
    fn test_missing_email_is_rejected() {
        let mut form = form();
        form.email = " ".to_string();
        assert_eq!(
            form.validate(None, day("2026-12-01")).unwrap_err(),
            "Email is required"
        );
    }
}
