//! Push payload rendering and notification-click routing

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::manifest::Manifest;
use super::ports::Clients;
use crate::error::Result;

const DEFAULT_TITLE: &str = "Trademore";
const DEFAULT_BODY: &str = "New notification from Trademore";
const DEFAULT_ICON: &str = "/icon-192x192.png";
const DEFAULT_BADGE: &str = "/og-image.webp";
const DEFAULT_VIBRATE: [u32; 3] = [100, 50, 100];

pub const OPEN_ACTION: &str = "open";
pub const DISMISS_ACTION: &str = "dismiss";

/// A button on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

impl NotificationAction {
    fn new(action: &str, title: &str) -> Self {
        Self {
            action: action.to_string(),
            title: title.to_string(),
        }
    }

    fn defaults() -> Vec<Self> {
        vec![
            Self::new(OPEN_ACTION, "Open App"),
            Self::new(DISMISS_ACTION, "Dismiss"),
        ]
    }
}

/// Inbound push payload. Every field is optional; unknown fields, and known
/// fields of the wrong type, are kept and travel with the notification data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub image: Option<String>,
    pub require_interaction: Option<bool>,
    pub actions: Option<Vec<NotificationAction>>,
    pub url: Option<String>,
    pub extra: Map<String, Value>,
}

impl PushPayload {
    /// JSON object payloads are read field by field; anything else becomes
    /// the notification body.
    pub fn parse(data: Option<&[u8]>) -> Self {
        let Some(data) = data else {
            return Self::default();
        };
        match serde_json::from_slice::<Value>(data) {
            Ok(Value::Object(fields)) => Self::from_fields(fields),
            _ => {
                let text = String::from_utf8_lossy(data).into_owned();
                log::debug!("Push payload is not a JSON object, using it as text");
                Self {
                    body: Some(text).filter(|t| !t.is_empty()),
                    ..Self::default()
                }
            }
        }
    }

    fn from_fields(mut fields: Map<String, Value>) -> Self {
        fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
            match fields.remove(key) {
                Some(Value::String(s)) => Some(s),
                Some(other) => {
                    log::debug!("Ignoring push field {} of unexpected type", key);
                    fields.insert(key.to_string(), other);
                    None
                }
                None => None,
            }
        }

        let require_interaction = match fields.remove("requireInteraction") {
            Some(Value::Bool(flag)) => Some(flag),
            Some(other) => {
                log::debug!("Ignoring push field requireInteraction of unexpected type");
                fields.insert("requireInteraction".to_string(), other);
                None
            }
            None => None,
        };

        let actions = match fields.remove("actions") {
            Some(Value::Array(items)) => Some(
                items
                    .into_iter()
                    .filter_map(|item| serde_json::from_value::<NotificationAction>(item).ok())
                    .collect(),
            ),
            Some(other) => {
                log::debug!("Ignoring push field actions of unexpected type");
                fields.insert("actions".to_string(), other);
                None
            }
            None => None,
        };

        let url = take_string(&mut fields, "url");
        // data.url is always set, so a mistyped url must not ride along too
        fields.remove("url");

        Self {
            title: take_string(&mut fields, "title"),
            body: take_string(&mut fields, "body"),
            image: take_string(&mut fields, "image"),
            url,
            require_interaction,
            actions,
            extra: fields,
        }
    }
}

/// Data attached to a displayed notification, read back on click.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub url: String,
    pub date_of_arrival: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// What gets handed to the notifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub vibrate: Vec<u32>,
    pub require_interaction: bool,
    pub actions: Vec<NotificationAction>,
    pub data: NotificationData,
}

impl NotificationRequest {
    pub fn from_payload(payload: PushPayload, arrived_at: DateTime<Utc>) -> Self {
        let url = payload
            .url
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| "/".to_string());

        // Raw payload fields ride along in data, as the browser worker did.
        let mut raw = payload.extra.clone();
        for (key, value) in [
            ("title", payload.title.clone().map(Value::String)),
            ("body", payload.body.clone().map(Value::String)),
            ("image", payload.image.clone().map(Value::String)),
            ("requireInteraction", payload.require_interaction.map(Value::Bool)),
        ] {
            if let Some(value) = value {
                raw.insert(key.to_string(), value);
            }
        }

        Self {
            title: payload
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body: payload
                .body
                .filter(|b| !b.is_empty())
                .unwrap_or_else(|| DEFAULT_BODY.to_string()),
            icon: DEFAULT_ICON.to_string(),
            badge: DEFAULT_BADGE.to_string(),
            image: payload.image,
            vibrate: DEFAULT_VIBRATE.to_vec(),
            require_interaction: payload.require_interaction.unwrap_or(false),
            actions: payload.actions.unwrap_or_else(NotificationAction::defaults),
            data: NotificationData {
                url,
                date_of_arrival: arrived_at,
                payload: raw,
            },
        }
    }
}

/// Result of a notification click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum ClickOutcome {
    Dismissed,
    /// An open window was navigated and focused
    Focused { client_id: String, url: String },
    Opened { url: String },
    /// No window open and the platform cannot open one
    NoWindow { url: String },
}

/// Where a click should take the user. `None` for the dismiss action.
pub fn click_target(action: Option<&str>, data: &NotificationData) -> Option<String> {
    match action.unwrap_or_default() {
        DISMISS_ACTION => None,
        OPEN_ACTION | "" => Some(data.url.clone()),
        _ => Some("/".to_string()),
    }
}

/// Focus an app window (navigating it to the target) or open a new one.
pub async fn route_click(
    clients: &dyn Clients,
    manifest: &Manifest,
    action: Option<&str>,
    data: &NotificationData,
) -> Result<ClickOutcome> {
    let Some(target) = click_target(action, data) else {
        return Ok(ClickOutcome::Dismissed);
    };
    let url = manifest
        .resolve(&target)
        .map(|u| u.to_string())
        .unwrap_or(target);

    let windows = clients.windows().await?;
    if let Some(window) = windows
        .iter()
        .find(|w| w.focusable && w.url.contains(manifest.scope()))
    {
        clients.navigate(&window.id, &url).await?;
        clients.focus(&window.id).await?;
        return Ok(ClickOutcome::Focused {
            client_id: window.id.clone(),
            url,
        });
    }

    if clients.open_window(&url).await? {
        Ok(ClickOutcome::Opened { url })
    } else {
        log::debug!("No window to show {}", url);
        Ok(ClickOutcome::NoWindow { url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;
    use crate::worker::ports::WindowClient;
    use crate::worker::testing::FakeClients;

    fn manifest() -> Manifest {
        Manifest::from_config(&WorkerConfig {
            origin: "https://trademore.test".to_string(),
            scope: "https://trademore.test/".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_missing_payload_uses_brand_defaults() {
        let n = NotificationRequest::from_payload(PushPayload::parse(None), now());
        assert_eq!(n.title, "Trademore");
        assert_eq!(n.body, "New notification from Trademore");
        assert_eq!(n.icon, "/icon-192x192.png");
        assert_eq!(n.badge, "/og-image.webp");
        assert_eq!(n.vibrate, vec![100, 50, 100]);
        assert_eq!(n.actions.len(), 2);
        assert_eq!(n.actions[0].action, "open");
        assert_eq!(n.data.url, "/");
        assert!(!n.require_interaction);
    }

    #[test]
    fn test_json_payload_fields() {
        let raw = br#"{"title":"Margin call","body":"EURUSD at 80%","url":"/dashboard","requireInteraction":true,"alertId":7}"#;
        let n = NotificationRequest::from_payload(PushPayload::parse(Some(raw)), now());
        assert_eq!(n.title, "Margin call");
        assert_eq!(n.body, "EURUSD at 80%");
        assert_eq!(n.data.url, "/dashboard");
        assert!(n.require_interaction);
        assert_eq!(n.data.payload["alertId"], 7);
        assert_eq!(n.data.payload["title"], "Margin call");
    }

    #[test]
    fn test_mistyped_field_keeps_other_fields() {
        let raw = br#"{"title":"Margin call","body":"EURUSD at 80%","requireInteraction":"yes","actions":[{"action":"view","title":"View"},{"bogus":1}]}"#;
        let n = NotificationRequest::from_payload(PushPayload::parse(Some(raw)), now());
        assert_eq!(n.title, "Margin call");
        assert_eq!(n.body, "EURUSD at 80%");
        assert!(!n.require_interaction);
        assert_eq!(n.actions, vec![NotificationAction::new("view", "View")]);
        assert_eq!(n.data.payload["requireInteraction"], "yes");
    }

    #[test]
    fn test_mistyped_title_falls_back_to_default() {
        let raw = br#"{"title":5,"url":"/alerts"}"#;
        let n = NotificationRequest::from_payload(PushPayload::parse(Some(raw)), now());
        assert_eq!(n.title, "Trademore");
        assert_eq!(n.data.url, "/alerts");
    }

    #[test]
    fn test_text_payload_becomes_body() {
        let n = NotificationRequest::from_payload(PushPayload::parse(Some(b"Markets open")), now());
        assert_eq!(n.title, "Trademore");
        assert_eq!(n.body, "Markets open");
    }

    #[test]
    fn test_non_object_json_is_text() {
        let n = NotificationRequest::from_payload(PushPayload::parse(Some(b"42")), now());
        assert_eq!(n.body, "42");
    }

    #[test]
    fn test_click_targets() {
        let data = NotificationData {
            url: "/alerts".to_string(),
            date_of_arrival: now(),
            payload: Map::new(),
        };
        assert_eq!(click_target(Some("dismiss"), &data), None);
        assert_eq!(click_target(Some("open"), &data).as_deref(), Some("/alerts"));
        assert_eq!(click_target(None, &data).as_deref(), Some("/alerts"));
        assert_eq!(click_target(Some("snooze"), &data).as_deref(), Some("/"));
    }

    #[tokio::test]
    async fn test_click_focuses_app_window() {
        let clients = FakeClients::with_windows(vec![
            WindowClient {
                id: "other".to_string(),
                url: "https://elsewhere.test/".to_string(),
                focusable: true,
            },
            WindowClient {
                id: "app".to_string(),
                url: "https://trademore.test/education".to_string(),
                focusable: true,
            },
        ]);
        let data = NotificationData {
            url: "/alerts".to_string(),
            date_of_arrival: now(),
            payload: Map::new(),
        };

        let outcome = route_click(&clients, &manifest(), Some("open"), &data)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ClickOutcome::Focused {
                client_id: "app".to_string(),
                url: "https://trademore.test/alerts".to_string(),
            }
        );
        assert_eq!(clients.focused(), vec!["app".to_string()]);
    }

    #[tokio::test]
    async fn test_click_opens_window_when_none_open() {
        let clients = FakeClients::with_windows(Vec::new());
        let data = NotificationData {
            url: "/".to_string(),
            date_of_arrival: now(),
            payload: Map::new(),
        };

        let outcome = route_click(&clients, &manifest(), None, &data).await.unwrap();

        assert_eq!(
            outcome,
            ClickOutcome::Opened {
                url: "https://trademore.test/".to_string()
            }
        );
        assert_eq!(clients.opened(), vec!["https://trademore.test/".to_string()]);
    }

    #[tokio::test]
    async fn test_dismiss_touches_nothing() {
        let clients = FakeClients::with_windows(Vec::new());
        let data = NotificationData {
            url: "/".to_string(),
            date_of_arrival: now(),
            payload: Map::new(),
        };

        let outcome = route_click(&clients, &manifest(), Some("dismiss"), &data)
            .await
            .unwrap();

        assert_eq!(outcome, ClickOutcome::Dismissed);
        assert!(clients.opened().is_empty());
    }
}
