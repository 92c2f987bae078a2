//! End-to-end scenarios driving the engine the way a host does.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::cell::RefCell;
use std::rc::Rc;

use controller_app::barrier::FetchName;
use controller_app::errors::CLIENT_WEBSOCKET_ERROR;
use controller_app::session::{SESSION_COOKIE, USER_COOKIE};
use controller_app::views::{Theme, ThemeCache, ThemeCacheError};
use controller_app::{
    AppPhase, BarrierPolicy, BootstrapOutcome, ConnectionStatus, DispatchOutcome, Domain,
    EngineConfig, MemoryCookieStore, Notification, RouteDecision, SyncEngine, ToastLevel,
};
use serde_json::{json, Value};

// ─── Fixtures ────────────────────────────────────────────────

#[derive(Clone, Default)]
struct SharedCache(Rc<RefCell<Option<Theme>>>);

impl ThemeCache for SharedCache {
    fn load(&self) -> Result<Option<Theme>, ThemeCacheError> {
        Ok(self.0.borrow().clone())
    }

    fn store(&mut self, theme: &Theme) -> Result<(), ThemeCacheError> {
        *self.0.borrow_mut() = Some(theme.clone());
        Ok(())
    }
}

fn cookies(roles: &[&str]) -> MemoryCookieStore {
    let mut jar = MemoryCookieStore::new();
    jar.set(SESSION_COOKIE, "s3cr3t");
    jar.set(
        USER_COOKIE,
        json!({"id": 1, "username": "admin", "roles": roles}).to_string(),
    );
    jar
}

fn engine_with(config: EngineConfig, roles: &[&str]) -> (SyncEngine, SharedCache) {
    let cache = SharedCache::default();
    let engine = SyncEngine::new(config, Box::new(cache.clone()), Box::new(cookies(roles)));
    (engine, cache)
}

/// Engine logged in as `admin`, socket open, battery queued.
fn connected(config: EngineConfig) -> (SyncEngine, SharedCache) {
    let (mut engine, cache) = engine_with(config, &["admin"]);
    engine.bootstrap(true);
    assert!(engine.should_open());
    engine.begin_connect("http://localhost:3100").unwrap();
    engine.on_open().unwrap();
    (engine, cache)
}

fn frame(domain: &str, kind: &str, data: Value) -> String {
    json!({"context": domain, "type": kind, "data": data}).to_string()
}

fn snapshot(engine: &SyncEngine) -> Value {
    serde_json::to_value(engine.state()).unwrap()
}

fn answer_battery(engine: &mut SyncEngine) {
    let frames = [
        frame("SETTINGS", "SETTINGS_THEME", json!({"value": {"primary_color": "#123456"}})),
        frame("CONTACTS", "CONTACTS", json!({"contacts": []})),
        frame("CREDENTIALS", "CREDENTIALS", json!({"credential_records": []})),
        frame("ROLES", "ROLES", json!({"roles": [{"role_id": 1, "role_name": "admin"}]})),
        frame("ORGANIZATION", "ORGANIZATION_NAME", json!([{"value": {"name": "Acme"}}])),
        frame("IMAGES", "IMAGE_LIST", json!({"name": "logo.png"})),
        frame("USERS", "USERS", json!({"users": []})),
    ];
    for raw in &frames {
        assert_eq!(engine.on_message(raw), DispatchOutcome::Handled);
    }
}

// ─── Loading ─────────────────────────────────────────────────

#[test]
fn battery_is_filtered_and_registered() {
    let (mut engine, _) = connected(EngineConfig::default());
    let sent: Vec<(String, String)> = engine
        .take_outbox()
        .into_iter()
        .map(|e| (e.domain, e.kind))
        .collect();

    assert_eq!(sent.len(), 7);
    assert_eq!(sent[0], ("SETTINGS".to_string(), "GET_THEME".to_string()));
    assert_eq!(sent[6], ("USERS".to_string(), "GET_ALL".to_string()));
    assert_eq!(engine.barrier().pending().count(), 7);
    assert_eq!(engine.status(), ConnectionStatus::Authenticating);
    assert_eq!(engine.app_phase(), AppPhase::Loading);
}

#[test]
fn battery_without_permissions_only_has_unconditional_fetches() {
    let (mut engine, _) = engine_with(EngineConfig::default(), &[]);
    engine.bootstrap(true);
    engine.begin_connect("https://controller.example").unwrap();
    engine.on_open().unwrap();

    let pending: Vec<FetchName> = engine.barrier().pending().collect();
    assert_eq!(
        pending,
        vec![FetchName::Theme, FetchName::Organization, FetchName::Logo]
    );
}

#[test]
fn app_loads_only_after_last_fetch_answers() {
    let (mut engine, cache) = connected(EngineConfig::default());
    answer_battery(&mut engine);

    assert!(engine.is_app_loaded());
    assert_eq!(engine.status(), ConnectionStatus::Ready);
    assert_eq!(engine.app_phase(), AppPhase::Ready);
    assert_eq!(engine.resolve_route("/contacts"), RouteDecision::Render);
    assert_eq!(engine.state().organization_name.as_deref(), Some("Acme"));
    assert_eq!(engine.state().theme.get("primary_color"), Some("#123456"));
    assert_eq!(cache.0.borrow().as_ref(), Some(&engine.state().theme));
}

#[test]
fn theme_and_contacts_barrier_scenario() {
    let (mut engine, _) = engine_with(EngineConfig::default(), &["user"]);
    engine.bootstrap(true);
    engine.begin_connect("http://localhost").unwrap();
    engine.on_open().unwrap();

    // Answer everything but THEME and CONTACTS first.
    for raw in [
        frame("CREDENTIALS", "CREDENTIALS", json!({"credential_records": []})),
        frame("ROLES", "ROLES", json!({"roles": []})),
        frame("SETTINGS", "SETTINGS_ORGANIZATION", json!({"companyName": "Acme"})),
        frame("SETTINGS", "LOGO", json!({"image": "..."})),
    ] {
        engine.on_message(&raw);
    }
    assert_eq!(
        engine.barrier().pending().collect::<Vec<_>>(),
        vec![FetchName::Theme, FetchName::Contacts]
    );

    engine.on_message(&frame("CONTACTS", "CONTACTS", json!({"contacts": []})));
    assert!(!engine.is_app_loaded());

    engine.on_message(&frame("SETTINGS", "SETTINGS_THEME", json!({"value": {}})));
    assert!(engine.is_app_loaded());
}

#[test]
fn ready_signal_follows_barrier() {
    use futures::StreamExt;
    use futures_signals::signal::SignalExt;

    let (mut engine, _) = connected(EngineConfig::default());
    let mut loading = engine.ready_signal().to_stream();
    assert_eq!(futures::executor::block_on(loading.next()), Some(false));

    answer_battery(&mut engine);
    let mut ready = engine.ready_signal().to_stream();
    assert_eq!(futures::executor::block_on(ready.next()), Some(true));
}

// ─── Routing failures ────────────────────────────────────────

#[test]
fn unknown_domain_emits_one_notification_and_changes_nothing() {
    let (mut engine, _) = connected(EngineConfig::default());
    let before = snapshot(&engine);

    let outcome = engine.on_message(&frame("WIDGETS", "WIDGETS", json!({"x": 1})));

    assert_eq!(outcome, DispatchOutcome::Unrecognized);
    assert_eq!(snapshot(&engine), before);
    assert_eq!(engine.barrier().pending().count(), 7);
    assert_eq!(
        engine.drain_notifications(),
        vec![Notification::error(
            "Error - Unrecognized Websocket Message Type: WIDGETS"
        )]
    );
}

#[test]
fn unknown_kind_names_the_kind() {
    let (mut engine, _) = connected(EngineConfig::default());
    let before = snapshot(&engine);

    engine.on_message(&frame("USERS", "USER_TELEPORTED", json!({})));

    assert_eq!(snapshot(&engine), before);
    let toasts = engine.drain_notifications();
    assert_eq!(toasts.len(), 1);
    assert!(toasts[0].message.ends_with("USER_TELEPORTED"));
}

#[test]
fn malformed_frames_become_client_errors() {
    let (mut engine, _) = connected(EngineConfig::default());

    assert_eq!(engine.on_message("{not json"), DispatchOutcome::Failed);
    assert_eq!(
        engine.on_message(&frame("CONTACTS", "CONTACTS", json!({"contacts": "nope"}))),
        DispatchOutcome::Failed
    );

    let toasts = engine.drain_notifications();
    assert_eq!(toasts, vec![Notification::error(CLIENT_WEBSOCKET_ERROR); 2]);
    assert!(engine.barrier().is_pending(FetchName::Contacts));
}

#[test]
fn server_error_notification_text() {
    let (mut engine, _) = connected(EngineConfig::default());
    engine.on_message(&frame(
        "ERROR",
        "SERVER_ERROR",
        json!({"errorCode": 503, "errorReason": "maintenance"}),
    ));
    assert_eq!(
        engine.drain_notifications()[0].message,
        "Server Error - 503 \n Reason: 'maintenance'"
    );
}

#[test]
fn presentation_verified_is_a_notice() {
    let (mut engine, _) = connected(EngineConfig::default());
    engine.on_message(&frame("PRESENTATIONS", "VERIFIED", Value::Null));
    let toasts = engine.drain_notifications();
    assert_eq!(toasts[0].level, ToastLevel::Notice);
    assert_eq!(toasts[0].message, "Success - Verified Credential");
}

// ─── Domain handlers ─────────────────────────────────────────

#[test]
fn contacts_reconcile_newest_first() {
    let (mut engine, _) = connected(EngineConfig::default());
    engine.on_message(&frame(
        "CONTACTS",
        "CONTACTS",
        json!({"contacts": [
            {"contact_id": 1, "created_at": "2021-01-10T00:00:00Z"},
            {"contact_id": 2, "created_at": "2021-01-05T00:00:00Z"}
        ]}),
    ));
    engine.on_message(&frame(
        "CONTACTS",
        "CONTACTS",
        json!({"contacts": [{"contact_id": 2, "created_at": "2021-01-20T00:00:00Z"}]}),
    ));

    assert_eq!(engine.state().contacts.ids(), vec![2, 1]);
}

#[test]
fn user_lifecycle() {
    let (mut engine, _) = connected(EngineConfig::default());
    engine.on_message(&frame(
        "USERS",
        "USERS",
        json!({"users": [
            {"user_id": 1, "username": "a", "created_at": "2021-03-01"},
            {"user_id": 3, "username": "b", "created_at": "2021-02-01"},
            {"user_id": 5, "username": "c", "created_at": "2021-01-01"}
        ]}),
    ));
    assert_eq!(engine.state().users.ids(), vec![1, 3, 5]);

    engine.on_message(&frame("USERS", "USER_DELETED", json!(3)));
    assert_eq!(engine.state().users.ids(), vec![1, 5]);

    engine.on_message(&frame("USERS", "USER_DELETED", json!(42)));
    assert_eq!(engine.state().users.ids(), vec![1, 5]);

    engine.on_message(&frame(
        "USERS",
        "USER_CREATED",
        json!({"user": [{"user_id": 9, "username": "new", "created_at": "2021-04-01"}]}),
    ));
    assert_eq!(engine.state().users.ids(), vec![1, 5, 9]);
    assert_eq!(engine.state().user.as_ref().map(|u| u.user_id), Some(9));

    engine.on_message(&frame(
        "USERS",
        "USER_UPDATED",
        json!({"updatedUser": {"user_id": 5, "username": "renamed"}}),
    ));
    assert_eq!(engine.state().users.ids(), vec![1, 5, 9]);
    assert_eq!(
        engine.state().users.get(&5).and_then(|u| u.username.as_deref()),
        Some("renamed")
    );

    engine.on_message(&frame("USERS", "USER_SUCCESS", json!("User updated")));
    assert_eq!(engine.state().success_message, Some(json!("User updated")));

    engine.clear_response_state();
    assert_eq!(engine.state().success_message, None);
}

#[test]
fn credentials_snapshot_clears_focused_connection() {
    let (mut engine, _) = connected(EngineConfig::default());

    engine.on_message(&frame(
        "INVITATIONS",
        "INVITATION",
        json!({"invitation_record": {"invitation_url": "https://x/inv"}}),
    ));
    assert_eq!(engine.state().qr_code_url.as_deref(), Some("https://x/inv"));

    engine.on_message(&frame(
        "INVITATIONS",
        "SINGLE_USE_USED",
        json!({"workflow": "test_id", "connection_id": "abc"}),
    ));
    assert_eq!(engine.state().focused_connection_id.as_deref(), Some("abc"));
    assert_eq!(engine.state().qr_code_url, None);

    engine.on_message(&frame(
        "CREDENTIALS",
        "CREDENTIALS",
        json!({"credential_records": [
            {"credential_exchange_id": "x1", "connection_id": "abc", "created_at": "2021-01-01"}
        ]}),
    ));
    assert_eq!(engine.state().focused_connection_id, None);
    assert_eq!(engine.state().credentials.len(), 1);
}

#[test]
fn other_workflows_do_not_focus() {
    let (mut engine, _) = connected(EngineConfig::default());
    engine.on_message(&frame(
        "INVITATIONS",
        "SINGLE_USE_USED",
        json!({"workflow": "onboarding", "connection_id": "abc"}),
    ));
    assert_eq!(engine.state().focused_connection_id, None);
}

#[test]
fn domain_error_blocks_by_default() {
    let (mut engine, _) = connected(EngineConfig::default());

    let outcome = engine.on_message(&frame("CONTACTS", "CONTACTS_ERROR", json!({"error": "db"})));

    assert_eq!(outcome, DispatchOutcome::Handled);
    assert!(engine.barrier().is_pending(FetchName::Contacts));
    assert_eq!(engine.state().error_message.as_deref(), Some("db"));
    assert!(engine.drain_notifications().is_empty());
}

#[test]
fn domain_error_completes_under_lenient_policy() {
    let config = EngineConfig::default().with_barrier_policy(BarrierPolicy::ErrorsComplete);
    let (mut engine, _) = connected(config);

    engine.on_message(&frame("DEMOGRAPHICS", "DEMOGRAPHICS_ERROR", json!({"error": "x"})));

    assert!(!engine.barrier().is_pending(FetchName::Contacts));
    assert!(engine.barrier().is_pending(FetchName::Users));
}

// ─── Session and connection lifecycle ────────────────────────

#[test]
fn anonymous_bootstrap_loads_immediately() {
    let cache = SharedCache::default();
    let mut engine = SyncEngine::new(
        EngineConfig::default(),
        Box::new(cache),
        Box::new(MemoryCookieStore::new()),
    );
    assert_eq!(engine.app_phase(), AppPhase::Loading);

    assert_eq!(engine.bootstrap(true), BootstrapOutcome::Anonymous);
    assert!(!engine.should_open());
    assert_eq!(engine.app_phase(), AppPhase::Unauthenticated);
    assert_eq!(engine.resolve_route("/users"), RouteDecision::Redirect("/login"));
}

#[test]
fn unavailable_session_check_keeps_loading() {
    let (mut engine, _) = engine_with(EngineConfig::default(), &["admin"]);
    assert_eq!(engine.bootstrap(false), BootstrapOutcome::Unavailable);
    assert!(!engine.should_open());
    assert_eq!(engine.app_phase(), AppPhase::Loading);
}

#[test]
fn close_then_reconnect() {
    let (mut engine, _) = connected(EngineConfig::default());
    answer_battery(&mut engine);
    let retry = engine.retry_flag();

    engine.on_closed(Some(1006), "abnormal");

    assert_eq!(engine.status(), ConnectionStatus::Disconnected);
    assert!(!engine.session().is_logged_in());
    assert_ne!(engine.retry_flag(), retry);
    assert!(engine.state().roles.is_empty());
    assert_eq!(engine.app_phase(), AppPhase::Loading);
    assert!(!engine.should_open());

    engine.bootstrap(true);
    assert!(engine.should_open());
    engine.begin_connect("http://localhost:3100").unwrap();
    engine.on_open().unwrap();
    assert_eq!(engine.take_outbox().len(), 7);
    answer_battery(&mut engine);
    assert_eq!(engine.app_phase(), AppPhase::Ready);
}

#[test]
fn transport_error_notifies_without_closing() {
    let (mut engine, _) = connected(EngineConfig::default());
    engine.on_transport_error("connection reset");
    assert_eq!(
        engine.drain_notifications(),
        vec![Notification::error(CLIENT_WEBSOCKET_ERROR)]
    );
    assert_eq!(engine.status(), ConnectionStatus::Authenticating);
}

#[test]
fn socket_error_then_abnormal_close_keeps_the_error_toast() {
    // Browsers fire a bare `error` event, then close with 1006.
    let (mut engine, _) = connected(EngineConfig::default());
    engine.on_transport_error("websocket error");
    engine.on_closed(Some(1006), "");

    let toasts = engine.drain_notifications();
    assert_eq!(toasts.first(), Some(&Notification::error(CLIENT_WEBSOCKET_ERROR)));
    assert_eq!(engine.status(), ConnectionStatus::Disconnected);
}

#[test]
fn logout_clears_everything() {
    let (mut engine, _) = connected(EngineConfig::default());
    answer_battery(&mut engine);

    assert_eq!(engine.logout(), "/login");

    assert!(engine.wants_close());
    assert!(engine.cookies().get(SESSION_COOKIE).is_none());
    assert!(engine.cookies().get(USER_COOKIE).is_none());
    assert!(engine.state().roles.is_empty());
    assert_eq!(engine.state().organization_name, None);
    assert_eq!(engine.app_phase(), AppPhase::Unauthenticated);

    engine.on_closed(Some(1000), "logout");
    assert_eq!(engine.status(), ConnectionStatus::Disconnected);
    assert_eq!(engine.app_phase(), AppPhase::Unauthenticated);
    assert!(!engine.should_open());
}

#[test]
fn frames_in_flight_after_logout_are_discarded() {
    let (mut engine, _) = connected(EngineConfig::default());
    answer_battery(&mut engine);
    engine.logout();

    let pushed = frame("CONTACTS", "CONTACTS", json!({"contacts": [{"contact_id": 9}]}));
    assert_eq!(engine.on_message(&pushed), DispatchOutcome::Discarded);
    assert!(engine.state().contacts.is_empty());

    engine.on_closed(Some(1000), "logout");
    assert!(engine.state().contacts.is_empty());
    assert_eq!(engine.on_message(&pushed), DispatchOutcome::Discarded);
    assert!(engine.state().contacts.is_empty());
    assert!(engine.drain_notifications().is_empty());
    assert_eq!(engine.app_phase(), AppPhase::Unauthenticated);
}

#[test]
fn session_countdown_logs_out() {
    let config = EngineConfig {
        session_minutes: 2,
        ..EngineConfig::default()
    };
    let (mut engine, _) = connected(config);

    assert!(!engine.tick_session());
    engine.touch_session();
    assert!(!engine.tick_session());
    assert!(engine.tick_session());
    assert!(!engine.session().is_logged_in());
}

#[test]
fn send_requires_open_socket() {
    let (mut engine, _) = engine_with(EngineConfig::default(), &["admin"]);
    assert!(engine.send(Domain::Contacts, "GET_ALL", json!({})).is_err());

    engine.bootstrap(true);
    engine.begin_connect("http://localhost").unwrap();
    assert!(engine.send(Domain::Contacts, "GET_ALL", json!({})).is_err());

    engine.on_open().unwrap();
    engine.take_outbox();
    engine
        .send(Domain::Contacts, "CREATE", json!({"label": "Bob"}))
        .unwrap();
    let out = engine.take_outbox();
    assert_eq!(out[0].kind, "CREATE");
    assert_eq!(out[0].payload["label"], "Bob");
}

#[test]
fn connect_rejects_bad_origin_without_changing_state() {
    let (mut engine, _) = engine_with(EngineConfig::default(), &["admin"]);
    engine.bootstrap(true);
    assert!(engine.begin_connect("file:///tmp/index.html").is_err());
    assert_eq!(engine.status(), ConnectionStatus::Disconnected);
    assert!(engine.should_open());
}

// ─── Theme ───────────────────────────────────────────────────

#[test]
fn cached_theme_is_used_at_startup() {
    let cache = SharedCache::default();
    let custom = Theme::from_tokens([("text_color".to_string(), "#222".to_string())]);
    *cache.0.borrow_mut() = Some(custom.clone());

    let engine = SyncEngine::new(
        EngineConfig::default(),
        Box::new(cache),
        Box::new(MemoryCookieStore::new()),
    );
    assert_eq!(engine.state().theme, custom);
}

#[test]
fn theme_editing() {
    let (mut engine, _) = connected(EngineConfig::default());
    engine.take_outbox();

    let edit = Theme::from_tokens([
        ("primary_color".to_string(), "#000".to_string()),
        ("border".to_string(), "#111".to_string()),
    ]);
    engine.update_theme(&edit);
    engine.update_theme(&edit);
    assert_eq!(engine.state().changed_styles, vec!["border", "primary_color"]);

    engine.undo_style("border");
    assert_eq!(engine.state().theme.get("border"), Some("#e3e3e3"));
    assert_eq!(engine.state().changed_styles, vec!["primary_color"]);

    engine.save_theme().unwrap();
    let out = engine.take_outbox();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].kind, "SET_THEME");
    assert_eq!(out[0].payload["primary_color"], "#000");
    assert!(engine.state().changed_styles.is_empty());
}
