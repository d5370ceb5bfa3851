//! Order status change notifications.
//!
//! When an admin changes an order's status and the order carries an email,
//! a JSON message is posted to the configured endpoint in a background task.
//! Delivery is best effort: failures are logged and never surface to the admin.

use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use millets_core::{OrderId, OrderStatus};

/// Errors from a single notification attempt.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Endpoint returned {0}")]
    Status(u16),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusMessage<'a> {
    email: &'a str,
    order_id: OrderId,
    new_status: &'a str,
}

/// Posts order status changes to an external endpoint.
#[derive(Clone)]
pub struct StatusNotifier {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl StatusNotifier {
    /// Create a notifier. With no endpoint every notification is skipped.
    #[must_use]
    pub const fn new(client: reqwest::Client, endpoint: Option<String>) -> Self {
        Self { client, endpoint }
    }

    /// Send one notification and wait for the answer.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the request fails or the endpoint rejects it.
    pub async fn send(
        &self,
        endpoint: &str,
        email: &str,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<(), NotifyError> {
        let message = StatusMessage {
            email,
            order_id,
            new_status: status.as_str(),
        };
        let response = self.client.post(endpoint).json(&message).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status().as_u16()));
        }
        Ok(())
    }

    /// Notify in the background. Returns the task handle, or `None` when no
    /// endpoint is configured.
    pub fn notify(
        &self,
        email: &str,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Option<JoinHandle<()>> {
        let Some(endpoint) = self.endpoint.clone() else {
            debug!(%order_id, "No status endpoint configured, skipping notification");
            return None;
        };
        let notifier = self.clone();
        let email = email.to_string();

        Some(tokio::spawn(async move {
            match notifier.send(&endpoint, &email, order_id, status).await {
                Ok(()) => debug!(%order_id, %status, "Status notification sent"),
                Err(e) => warn!(%order_id, %status, error = %e, "Status notification failed"),
            }
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, Router, extract::State, http::StatusCode, routing::post};

    use super::*;

    type Seen = Arc<Mutex<Vec<serde_json::Value>>>;

    async fn spawn_endpoint(reply: StatusCode) -> (String, Seen) {
        let seen: Seen = Arc::default();
        let app = Router::new()
            .route(
                "/notify",
                post(
                    move |State(seen): State<Seen>, Json(body): Json<serde_json::Value>| async move {
                        seen.lock().unwrap().push(body);
                        reply
                    },
                ),
            )
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}/notify"), seen)
    }

    #[tokio::test]
    async fn test_notification_payload() {
        let (endpoint, seen) = spawn_endpoint(StatusCode::OK).await;
        let notifier = StatusNotifier::new(reqwest::Client::new(), Some(endpoint));

        notifier
            .notify("asha@example.in", OrderId::new(41), OrderStatus::InProcess)
            .unwrap()
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            seen[0],
            serde_json::json!({
                "email": "asha@example.in",
                "orderId": 41,
                "newStatus": "in process"
            })
        );
    }

    #[tokio::test]
    async fn test_endpoint_failure_is_reported_by_send() {
        let (endpoint, _) = spawn_endpoint(StatusCode::INTERNAL_SERVER_ERROR).await;
        let notifier = StatusNotifier::new(reqwest::Client::new(), Some(endpoint.clone()));

        let err = notifier
            .send(&endpoint, "asha@example.in", OrderId::new(41), OrderStatus::Delivered)
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Status(500)));
    }

    #[test]
    fn test_without_endpoint_nothing_is_spawned() {
        let notifier = StatusNotifier::new(reqwest::Client::new(), None);
        assert!(
            notifier
                .notify("asha@example.in", OrderId::new(1), OrderStatus::Cancelled)
                .is_none()
        );
    }
}
