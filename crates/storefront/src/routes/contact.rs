//! Contact form route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use millets_core::Email;

use crate::filters;
use crate::middleware::{OptionalAuth, PageContext};
use crate::models::Flash;
use crate::platform::ContactMessage;
use crate::state::AppState;

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub ctx: PageContext,
    pub email: String,
}

/// Contact form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactForm {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first problem.
    pub fn validate(&self) -> Result<ContactMessage, String> {
        let name = self.name.trim();
        let message = self.message.trim();
        if name.is_empty() {
            return Err("Name is required".to_string());
        }
        if message.is_empty() {
            return Err("Message is required".to_string());
        }
        let email = Email::parse(&self.email).map_err(|e| format!("Email: {e}"))?;

        Ok(ContactMessage {
            name: name.to_string(),
            email,
            subject: self.subject.trim().to_string(),
            message: message.to_string(),
        })
    }
}

/// Display the contact form.
pub async fn show(OptionalAuth(user): OptionalAuth, ctx: PageContext) -> impl IntoResponse {
    ContactTemplate {
        ctx,
        email: user.map(|u| u.email).unwrap_or_default(),
    }
}

/// Store a contact message.
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ContactForm>,
) -> Response {
    let message = match form.validate() {
        Ok(message) => message,
        Err(problem) => {
            Flash::error("Please check your message", problem)
                .set(&session)
                .await;
            return Redirect::to("/contact").into_response();
        }
    };

    match state.platform().create_contact(&message).await {
        Ok(()) => {
            info!("Contact message stored");
            Redirect::to("/contact-confirmation?status=success").into_response()
        }
        Err(e) => {
            warn!(error = %e, "Failed to store contact message");
            Redirect::to("/contact-confirmation?status=error").into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_form_validation() {
        let mut form = ContactForm {
            name: "Meera".to_string(),
            email: "meera@example.in".to_string(),
            subject: "Catering".to_string(),
            message: "Do you cater for 50?".to_string(),
        };
        assert_eq!(form.validate().unwrap().email.as_str(), "meera@example.in");

        form.email = "meera".to_string();
        assert!(form.validate().unwrap_err().starts_with("Email"));

        form.message = "   ".to_string();
        assert_eq!(form.validate().unwrap_err(), "Message is required");
    }
}
