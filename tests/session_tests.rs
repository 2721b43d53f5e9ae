//! Session capture, persistence and restore over the mock host.

mod common;

use std::path::PathBuf;

use common::{Harness, settle};
use serde_json::{Value, json};
use tempfile::TempDir;
use zenium::host::Surface;
use zenium::session::{PLACEHOLDER_TITLE, RestoreOutcome, SessionManager};
use zenium::ui::{UiEvent, UiRequest};
use zenium::view::TabSnapshot;
use zenium::{TabCategory, TabId};

fn session_file() -> (TempDir, PathBuf) {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = temp.path().join("session.json");
    (temp, path)
}

fn manager(h: &Harness, path: &PathBuf) -> SessionManager {
    SessionManager::new(path.clone(), h.view.clone(), h.ui.clone(), &h.config)
}

/// A UI that reports `order` and `states` and acknowledges tab rows.
fn ui_with(order: Value, states: Value) -> impl Fn(&UiRequest) -> Option<Value> + Send + 'static {
    move |request| match request {
        UiRequest::GetTabOrder => Some(order.clone()),
        UiRequest::GetTabStates => Some(states.clone()),
        _ => Some(Value::Bool(true)),
    }
}

fn ids(tabs: &[zenium::session::SessionTab]) -> Vec<String> {
    tabs.iter().map(|t| t.tab_id.to_string()).collect()
}

#[tokio::test]
async fn test_save_without_tabs_restores_nothing() {
    let (_temp, path) = session_file();
    let h = Harness::new();
    let session = manager(&h, &path).save().await.unwrap();

    assert!(session.is_empty());
    assert_eq!(session.active_tab_id, None);
    assert!(path.exists());

    let fresh = Harness::new();
    assert_eq!(manager(&fresh, &path).load_and_restore().await, RestoreOutcome::Empty);
    settle().await;
    assert!(fresh.log.requests().is_empty());
}

#[tokio::test]
async fn test_save_uses_ui_order_and_categories() {
    let (_temp, path) = session_file();
    let h = Harness::with_answers(ui_with(
        json!(["b", "a", "c"]),
        json!({"a": "pinned", "b": "essential"}),
    ));

    let a = h.open("a", "https://a.example/").await;
    h.view.navigate(&TabId::from("a"), "https://a.example/two").await;
    a.set_title("A two");

    let b = h.open("b", "https://b.example/").await;
    b.set_favicons(vec!["https://b.example/favicon.ico".to_string()]);
    h.open("c", "https://c.example/").await;
    h.view.unload_tab(&TabId::from("b")).await;

    let session = manager(&h, &path).save().await.unwrap();
    assert_eq!(ids(&session.tabs), vec!["b", "a", "c"]);
    assert_eq!(session.active_tab_id, Some(TabId::from("c")));

    let saved_a = &session.tabs[1];
    assert_eq!(saved_a.url, "https://a.example/two");
    assert_eq!(saved_a.history.entries.len(), 2);
    assert_eq!(saved_a.history.index, 1);
    assert_eq!(saved_a.history.entries[1].title.as_deref(), Some("A two"));
    assert_eq!(saved_a.category, TabCategory::Pinned);
    assert!(!saved_a.is_unloaded);

    let saved_b = &session.tabs[0];
    assert!(saved_b.is_unloaded);
    assert_eq!(saved_b.category, TabCategory::Essential);
    assert_eq!(saved_b.favicon_url.as_deref(), Some("https://b.example/favicon.ico"));

    let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk["activeTabId"], json!("c"));
    assert_eq!(on_disk["tabOrder"], json!(["b", "a", "c"]));
    assert_eq!(on_disk["tabs"][0]["isUnloaded"], json!(true));
}

#[tokio::test]
async fn test_round_trip_restores_active_tab_live_and_others_unloaded() {
    let (_temp, path) = session_file();
    let h = Harness::with_answers(ui_with(json!(["b", "a", "c"]), json!({"a": "pinned"})));
    let a = h.open("a", "https://a.example/").await;
    h.view.navigate(&TabId::from("a"), "https://a.example/two").await;
    a.set_title("A two");
    h.open("b", "https://b.example/").await;
    h.open("c", "https://c.example/").await;
    let saved = manager(&h, &path).save().await.unwrap();

    let fresh = Harness::new();
    let outcome = manager(&fresh, &path).load_and_restore().await;
    assert_eq!(
        outcome,
        RestoreOutcome::Restored {
            active: TabId::from("c"),
            restored: 3,
        }
    );
    settle().await;

    let c = TabId::from("c");
    assert!(fresh.view.is_loaded(&c));
    assert_eq!(fresh.view.active_tab_id(), Some(c.clone()));
    assert!(fresh.view.is_unloaded(&TabId::from("a")));
    assert!(fresh.view.is_unloaded(&TabId::from("b")));
    assert_eq!(fresh.live_tabs(), 1);

    let rows: Vec<(String, String)> = fresh
        .log
        .requests()
        .into_iter()
        .filter_map(|request| match request {
            UiRequest::CreateTab { tab_id, .. } => Some(("live".to_string(), tab_id.to_string())),
            UiRequest::CreateUnloadedTab { tab_id, title, .. } => {
                Some((title, tab_id.to_string()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        rows,
        vec![
            (PLACEHOLDER_TITLE.to_string(), "b".to_string()),
            ("A two".to_string(), "a".to_string()),
            ("live".to_string(), "c".to_string()),
        ]
    );
    assert!(fresh.log.events().contains(&UiEvent::SwitchTab { tab_id: c }));

    // Bringing an unloaded tab back restores its whole back/forward list
    fresh.view.switch_tab(&TabId::from("a")).await;
    let restored = fresh.tab_surface("a");
    assert_eq!(restored.navigation_history(), saved.tabs[1].history);
    assert_eq!(restored.url(), "https://a.example/two");
}

#[tokio::test]
async fn test_round_trip_keeps_mixed_categories() {
    let (_temp, path) = session_file();
    let h = Harness::with_answers(ui_with(
        json!(["a", "b", "c"]),
        json!({"a": "pinned", "b": "essential"}),
    ));
    h.open("b", "https://b.example/").await;
    h.open("c", "https://c.example/").await;
    h.open("a", "https://a.example/").await;
    let saved = manager(&h, &path).save().await.unwrap();
    let categories: Vec<TabCategory> = saved.tabs.iter().map(|t| t.category).collect();
    assert_eq!(
        categories,
        vec![TabCategory::Pinned, TabCategory::Essential, TabCategory::Regular]
    );

    let fresh = Harness::new();
    let outcome = manager(&fresh, &path).load_and_restore().await;
    assert_eq!(
        outcome,
        RestoreOutcome::Restored {
            active: TabId::from("a"),
            restored: 3,
        }
    );
    settle().await;

    let mut restored: Vec<(String, TabCategory, bool)> = fresh
        .view
        .snapshots()
        .into_iter()
        .map(|snapshot| match snapshot {
            TabSnapshot::Loaded {
                tab_id, category, ..
            } => (tab_id.to_string(), category, true),
            TabSnapshot::Unloaded {
                tab_id,
                placeholder,
            } => (tab_id.to_string(), placeholder.category, false),
        })
        .collect();
    restored.sort_by(|x, y| x.0.cmp(&y.0));
    assert_eq!(
        restored,
        vec![
            ("a".to_string(), TabCategory::Pinned, true),
            ("b".to_string(), TabCategory::Essential, false),
            ("c".to_string(), TabCategory::Regular, false),
        ]
    );

    let rows: Vec<(String, TabCategory)> = fresh
        .log
        .requests()
        .into_iter()
        .filter_map(|request| match request {
            UiRequest::CreateTab {
                tab_id, category, ..
            }
            | UiRequest::CreateUnloadedTab {
                tab_id, category, ..
            } => Some((tab_id.to_string(), category)),
            _ => None,
        })
        .collect();
    assert_eq!(
        rows,
        vec![
            ("a".to_string(), TabCategory::Pinned),
            ("b".to_string(), TabCategory::Essential),
            ("c".to_string(), TabCategory::Regular),
        ]
    );

    // Loading the essential tab keeps its category on the live tab
    fresh.view.switch_tab(&TabId::from("b")).await;
    let b = fresh
        .view
        .snapshots()
        .into_iter()
        .find(|snapshot| snapshot.tab_id() == &TabId::from("b"));
    assert!(matches!(
        b,
        Some(TabSnapshot::Loaded {
            category: TabCategory::Essential,
            ..
        })
    ));
}

#[tokio::test]
async fn test_missing_active_falls_back_to_first_ordered_tab() {
    let (_temp, path) = session_file();
    std::fs::write(
        &path,
        r#"{
            "activeTabId": "gone",
            "tabOrder": ["y", "x"],
            "tabs": [
                {"tabId": "x", "url": "https://x.example/",
                 "history": {"index": 0, "entries": ["https://x.example/"]}},
                {"tabId": "y", "url": "https://y.example/",
                 "history": {"index": -1, "entries": []}}
            ]
        }"#,
    )
    .unwrap();

    let h = Harness::new();
    let outcome = manager(&h, &path).load_and_restore().await;
    assert_eq!(
        outcome,
        RestoreOutcome::Restored {
            active: TabId::from("y"),
            restored: 2,
        }
    );

    // Empty history: the active tab is loaded from its URL instead
    assert_eq!(h.tab_surface("y").url(), "https://y.example/");
    let placeholder = h.view.placeholder(&TabId::from("x")).unwrap();
    assert_eq!(placeholder.history.entries[0].url, "https://x.example/");
    assert_eq!(placeholder.history.entries[0].title, None);
}

#[tokio::test]
async fn test_corrupt_session_means_fresh_start() {
    let (_temp, path) = session_file();
    std::fs::write(&path, "{not json").unwrap();

    let h = Harness::new();
    let sessions = manager(&h, &path);
    assert_eq!(sessions.load(), None);
    assert_eq!(sessions.load_and_restore().await, RestoreOutcome::Empty);
    assert_eq!(h.view.tab_count(), 0);
}

#[tokio::test]
async fn test_clear_removes_saved_session() {
    let (_temp, path) = session_file();
    let h = Harness::new();
    h.open("a", "https://a.example/").await;
    let sessions = manager(&h, &path);
    sessions.save().await.unwrap();
    assert!(sessions.load().is_some());

    sessions.clear().unwrap();
    assert!(!path.exists());
    assert_eq!(sessions.load(), None);
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_order_saves_empty_order_sorted_by_id() {
    let (_temp, path) = session_file();
    let h = Harness::with_answers(|request| match request {
        UiRequest::GetTabOrder => None,
        UiRequest::GetTabStates => Some(json!({})),
        _ => Some(Value::Bool(true)),
    });
    h.open("zeta", "https://z.example/").await;
    h.open("alpha", "https://a.example/").await;

    let session = manager(&h, &path).save().await.unwrap();
    assert!(session.tab_order.is_empty());
    assert_eq!(ids(&session.tabs), vec!["alpha", "zeta"]);

    let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk["tabOrder"], json!([]));
    assert_eq!(h.ui.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_restore_switches_even_without_row_acks() {
    let (_temp, path) = session_file();
    let h = Harness::new();
    h.open("a", "https://a.example/").await;
    h.open("b", "https://b.example/").await;
    manager(&h, &path).save().await.unwrap();

    let silent = Harness::with_answers(|_| None);
    let outcome = manager(&silent, &path).load_and_restore().await;
    assert!(matches!(outcome, RestoreOutcome::Restored { restored: 2, .. }));
    settle().await;

    let active = silent.view.active_tab_id().unwrap();
    assert!(silent.log.events().contains(&UiEvent::SwitchTab { tab_id: active }));
    assert_eq!(silent.ui.pending_count(), 0);
}

#[tokio::test]
async fn test_tab_destroyed_while_saving_is_skipped() {
    let (_temp, path) = session_file();
    let h = Harness::new();
    let a = h.open("a", "https://a.example/").await;
    h.open("b", "https://b.example/").await;
    a.destroy_during_next_script();

    let session = manager(&h, &path).save().await.unwrap();
    assert_eq!(ids(&session.tabs), vec!["b"]);
}
