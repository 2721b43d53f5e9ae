use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::update::UpdateEvent;
use crate::view::{TabCategory, TabId};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Core → UI notification. Serialized as `{"event": "...", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "event",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum UiEvent {
    TitleUpdated {
        tab_id: TabId,
        title: String,
    },
    FaviconUpdated {
        tab_id: TabId,
        favicon_url: String,
    },
    UrlUpdated {
        tab_id: TabId,
        url: String,
    },
    /// A bulk history restore completed for a live tab.
    TabRestored {
        tab_id: TabId,
        title: String,
        url: String,
        favicon_url: Option<String>,
    },
    TabUnloaded {
        tab_id: TabId,
    },
    TabLoaded {
        tab_id: TabId,
    },
    /// Mark a tab row active after session restore.
    SwitchTab {
        tab_id: TabId,
    },
    /// No session to restore; the UI should open its first tab.
    CreateInitialTab,
    SetDraggable {
        draggable: bool,
    },
    SettingUpdated {
        key: String,
        value: Value,
    },
    /// Opaque action posted by a modal, forwarded to the main UI.
    ModalEvent {
        action: Value,
    },
    Update {
        update: UpdateEvent,
    },
}

/// Core → UI request that expects a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "request",
    content = "params",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum UiRequest {
    /// Response: array of tab ids, left to right.
    GetTabOrder,
    /// Response: object mapping tab id to category.
    GetTabStates,
    /// Create the row for a restored, unloaded tab. Response: any value (ack).
    CreateUnloadedTab {
        tab_id: TabId,
        url: String,
        title: String,
        favicon_url: Option<String>,
        category: TabCategory,
    },
    /// Create the row for a restored tab that is already live. Response: ack.
    CreateTab {
        tab_id: TabId,
        url: String,
        favicon_url: Option<String>,
        category: TabCategory,
    },
}

/// Everything the core sends to the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum UiMessage {
    Notify {
        #[serde(flatten)]
        event: UiEvent,
    },
    Request {
        id: u64,
        #[serde(flatten)]
        request: UiRequest,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UiError {
    #[error("UI did not answer within {0:?}")]
    Timeout(Duration),

    #[error("UI channel is closed")]
    Disconnected,

    #[error("malformed UI response: {0}")]
    Malformed(String),
}

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

/// Request/notify channel between the core and the renderer-side UI.
///
/// Outbound traffic is a stream of [`UiMessage`]s drained by the host glue.
/// Responses come back through [`UiBridge::respond`] with the id of the
/// request they answer.
pub struct UiBridge {
    outbound: mpsc::UnboundedSender<UiMessage>,
    /// Monotonically increasing request id counter.
    next_id: AtomicU64,
    /// Pending requests awaiting a response, keyed by request id.
    pending: Mutex<HashMap<u64, oneshot::Sender<Value>>>,
}

/// A request that has been sent and is waiting for its response.
pub struct PendingReply {
    id: u64,
    rx: oneshot::Receiver<Value>,
}

impl UiBridge {
    /// Create a bridge and the receiver the host glue drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiMessage>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let bridge = Self {
            outbound,
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        };
        (bridge, rx)
    }

    /// Fire-and-forget notification. A closed channel is logged, not an error.
    pub fn notify(&self, event: UiEvent) {
        debug_trace!("UI", "notify {:?}", event);
        if self.outbound.send(UiMessage::Notify { event }).is_err() {
            log::debug!("UI channel closed, dropping notification");
        }
    }

    /// Send `request` now and return a handle to await its response.
    pub fn send_request(&self, request: UiRequest) -> Result<PendingReply, UiError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        debug_log!("UI", "request #{} {:?}", id, request);
        if self.outbound.send(UiMessage::Request { id, request }).is_err() {
            self.pending.lock().remove(&id);
            return Err(UiError::Disconnected);
        }
        Ok(PendingReply { id, rx })
    }

    /// Wait for the response to `reply`, giving up after `timeout`.
    pub async fn wait(&self, reply: PendingReply, timeout: Duration) -> Result<Value, UiError> {
        let PendingReply { id, rx } = reply;
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(UiError::Disconnected),
            Err(_) => {
                self.pending.lock().remove(&id);
                log::warn!("UI request #{} timed out after {:?}", id, timeout);
                Err(UiError::Timeout(timeout))
            }
        }
    }

    /// Send a request and wait up to `timeout` for the response.
    pub async fn request(&self, request: UiRequest, timeout: Duration) -> Result<Value, UiError> {
        let reply = self.send_request(request)?;
        self.wait(reply, timeout).await
    }

    /// Like [`UiBridge::request`], decoding the response into `T`.
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        request: UiRequest,
        timeout: Duration,
    ) -> Result<T, UiError> {
        let value = self.request(request, timeout).await?;
        serde_json::from_value(value).map_err(|e| UiError::Malformed(e.to_string()))
    }

    /// Deliver the UI's response to request `id`.
    ///
    /// Returns false when no request with that id is pending (already timed
    /// out, or never sent).
    pub fn respond(&self, id: u64, value: Value) -> bool {
        let sender = self.pending.lock().remove(&id);
        match sender {
            Some(tx) => tx.send(value).is_ok(),
            None => {
                log::debug!("Discarding response to unknown or expired UI request #{}", id);
                false
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

/// Response shape of [`UiRequest::GetTabStates`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct TabStates(pub HashMap<TabId, TabCategory>);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_wire_format() {
        let msg = UiMessage::Notify {
            event: UiEvent::FaviconUpdated {
                tab_id: TabId::from("t1"),
                favicon_url: "https://a.example/favicon.ico".to_string(),
            },
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "kind": "notify",
                "event": "favicon-updated",
                "payload": {"tabId": "t1", "faviconUrl": "https://a.example/favicon.ico"}
            })
        );
    }

    #[test]
    fn test_unit_event_wire_format() {
        let msg = UiMessage::Notify {
            event: UiEvent::CreateInitialTab,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"kind": "notify", "event": "create-initial-tab"})
        );
    }

    #[test]
    fn test_request_wire_format() {
        let msg = UiMessage::Request {
            id: 4,
            request: UiRequest::GetTabOrder,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"kind": "request", "id": 4, "request": "get-tab-order"})
        );
    }

    #[tokio::test]
    async fn test_request_resolves_on_respond() {
        let (bridge, mut rx) = UiBridge::new();
        let reply = bridge.send_request(UiRequest::GetTabOrder).unwrap();

        let Some(UiMessage::Request { id, .. }) = rx.recv().await else {
            panic!("expected a request");
        };
        assert!(bridge.respond(id, json!(["a", "b"])));

        let value = bridge.wait(reply, Duration::from_secs(1)).await.unwrap();
        assert_eq!(value, json!(["a", "b"]));
        assert_eq!(bridge.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_clears_pending() {
        let (bridge, _rx) = UiBridge::new();
        let err = bridge
            .request(UiRequest::GetTabStates, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert_eq!(err, UiError::Timeout(Duration::from_secs(2)));
        assert_eq!(bridge.pending_count(), 0);
        // A late answer is discarded
        assert!(!bridge.respond(1, json!({})));
    }

    #[tokio::test]
    async fn test_closed_channel_is_disconnected() {
        let (bridge, rx) = UiBridge::new();
        drop(rx);
        let err = bridge
            .request(UiRequest::GetTabOrder, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, UiError::Disconnected);
    }

    #[tokio::test]
    async fn test_request_as_reports_malformed() {
        let (bridge, mut rx) = UiBridge::new();
        let responder = async {
            if let Some(UiMessage::Request { id, .. }) = rx.recv().await {
                bridge.respond(id, json!({"not": "a list"}));
            }
        };
        let request = bridge.request_as::<Vec<TabId>>(UiRequest::GetTabOrder, Duration::from_secs(1));
        let (result, _) = tokio::join!(request, responder);
        assert!(matches!(result, Err(UiError::Malformed(_))));
    }
}
