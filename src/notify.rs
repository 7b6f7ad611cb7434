//! Push-notification dispatch
//!
//! Delivery to devices is handled by the platform push service; this module
//! covers sending a remote command payload and routing incoming payloads to
//! a registered handler (the listener wires this into the failover
//! coordinator's remote-command handling).

use serde_json::{json, Value};

use crate::config::NotifyConfig;
use crate::constants::HTTP_TIMEOUT;
use crate::error::Error;

const FCM_SEND_URL: &str = "https://fcm.googleapis.com/fcm/send";

/// Handler invoked for every received payload
pub type NotificationHandler = Box<dyn Fn(&Value) + Send + Sync>;

/// Notification sender and local dispatcher
pub struct Notifier {
    server_key: Option<String>,
    http: reqwest::Client,
    handler: Option<NotificationHandler>,
}

impl Notifier {
    pub fn new(config: &NotifyConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::Notify(e.to_string()))?;

        Ok(Self {
            server_key: config.server_key.clone(),
            http,
            handler: None,
        })
    }

    /// Register the callback for incoming payloads
    pub fn set_handler(&mut self, handler: NotificationHandler) {
        self.handler = Some(handler);
    }

    /// Route a received payload to the registered handler
    pub fn dispatch(&self, payload: &Value) {
        if let Some(handler) = &self.handler {
            handler(payload);
        }
    }

    /// Send a high-priority notification to one device
    ///
    /// Requires the server key; sending is a configuration error without it.
    pub async fn send(
        &self,
        device_token: &str,
        title: &str,
        body: &str,
        data: Option<Value>,
    ) -> Result<Value, Error> {
        let server_key = self
            .server_key
            .as_ref()
            .ok_or_else(|| Error::Config("notification server key is required".to_string()))?;

        let payload = json!({
            "to": device_token,
            "notification": { "title": title, "body": body },
            "data": data.unwrap_or_else(|| json!({})),
            "priority": "high",
        });

        let response = self
            .http
            .post(FCM_SEND_URL)
            .header("Authorization", format!("key={}", server_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Notify(e.to_string()))?;

        let response = response
            .error_for_status()
            .map_err(|e| Error::Notify(e.to_string()))?;
        response.json().await.map_err(|e| Error::Notify(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn send_without_server_key_is_a_config_error() {
        let notifier = Notifier::new(&NotifyConfig::default()).unwrap();
        let result = notifier.send("device", "t", "b", None).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn dispatch_reaches_the_registered_handler() {
        let mut notifier = Notifier::new(&NotifyConfig::default()).unwrap();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_handler = seen.clone();

        notifier.set_handler(Box::new(move |payload| {
            assert_eq!(
                payload.get("data").and_then(|d| d.get("action")),
                Some(&json!("play_offline"))
            );
            seen_in_handler.fetch_add(1, Ordering::SeqCst);
        }));

        notifier.dispatch(&json!({ "data": { "action": "play_offline" } }));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispatch_without_handler_is_a_noop() {
        let notifier = Notifier::new(&NotifyConfig::default()).unwrap();
        notifier.dispatch(&json!({}));
    }
}
