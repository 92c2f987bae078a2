//! # Browser Host
//!
//! `BrowserClient` is the JavaScript face of the engine. The page performs
//! the session check with `fetch` and passes the result to `bootstrap`;
//! everything after that (socket, fetch battery, reconciliation) runs here.
//! After each socket event the registered change listener is called so the
//! page can re-render from `state_json`.

use std::cell::RefCell;
use std::rc::Rc;

use controller_app::views::{ThemeCacheError, THEME_CACHE_KEY};
use controller_app::{CookieStore, Domain, EngineConfig, RouteDecision, SyncEngine, Theme, ThemeCache};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlDocument, Storage};

use crate::transport::browser::{BrowserSocket, SocketHandler};
use crate::transport::ConnectionEvent;

fn js_error(error: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}

// =============================================================================
// Browser-backed stores
// =============================================================================

/// Theme cache in `localStorage`.
#[derive(Debug)]
pub struct LocalStorageThemeCache {
    storage: Option<Storage>,
}

impl LocalStorageThemeCache {
    /// Use the window's `localStorage`, if the page may access it.
    pub fn new() -> Self {
        let storage = web_sys::window().and_then(|window| window.local_storage().ok().flatten());
        Self { storage }
    }
}

impl Default for LocalStorageThemeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeCache for LocalStorageThemeCache {
    fn load(&self) -> Result<Option<Theme>, ThemeCacheError> {
        let Some(storage) = &self.storage else {
            return Ok(None);
        };
        let raw = storage
            .get_item(THEME_CACHE_KEY)
            .map_err(|e| ThemeCacheError::Io(format!("{e:?}")))?;
        raw.map(|raw| serde_json::from_str(&raw)).transpose().map_err(ThemeCacheError::from)
    }

    fn store(&mut self, theme: &Theme) -> Result<(), ThemeCacheError> {
        let storage = self
            .storage
            .as_ref()
            .ok_or_else(|| ThemeCacheError::Io("localStorage unavailable".to_string()))?;
        let raw = serde_json::to_string(theme)?;
        storage
            .set_item(THEME_CACHE_KEY, &raw)
            .map_err(|e| ThemeCacheError::Io(format!("{e:?}")))
    }
}

/// Cookie jar over `document.cookie`.
#[derive(Debug)]
pub struct DocumentCookieStore {
    document: Option<HtmlDocument>,
}

impl DocumentCookieStore {
    /// Use the window's document.
    pub fn new() -> Self {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.dyn_into::<HtmlDocument>().ok());
        Self { document }
    }
}

impl Default for DocumentCookieStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Find `name` in a `document.cookie` string and URI-decode its value.
pub fn parse_cookie(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        if key != name {
            return None;
        }
        let decoded = js_sys::decode_uri_component(value)
            .map(String::from)
            .unwrap_or_else(|_| value.to_string());
        Some(decoded)
    })
}

impl CookieStore for DocumentCookieStore {
    fn get(&self, name: &str) -> Option<String> {
        let header = self.document.as_ref()?.cookie().ok()?;
        parse_cookie(&header, name)
    }

    fn remove(&mut self, name: &str) {
        let Some(document) = &self.document else {
            return;
        };
        let expired = format!("{name}=; expires=Thu, 01 Jan 1970 00:00:00 GMT; path=/");
        if let Err(error) = document.set_cookie(&expired) {
            tracing::warn!(?error, name, "failed to remove cookie");
        }
    }
}

// =============================================================================
// Engine host
// =============================================================================

struct Host {
    engine: SyncEngine,
    socket: Option<BrowserSocket>,
    listener: Option<js_sys::Function>,
}

impl Host {
    fn flush(&mut self) {
        let Some(socket) = &self.socket else {
            return;
        };
        for envelope in self.engine.take_outbox() {
            let sent = envelope.to_json().map_err(js_error).and_then(|text| socket.send(&text).map_err(js_error));
            if let Err(error) = sent {
                tracing::warn!(?error, domain = %envelope.domain, kind = %envelope.kind, "dropping outbound message");
            }
        }
        if self.engine.wants_close() {
            socket.close();
        }
    }
}

impl SocketHandler for Host {
    fn handle(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Ready => {
                if let Err(error) = self.engine.on_open() {
                    tracing::warn!(%error, "socket opened in unexpected state");
                }
            }
            ConnectionEvent::Message(text) => {
                self.engine.on_message(&text);
            }
            ConnectionEvent::TransportError(detail) => self.engine.on_transport_error(&detail),
            ConnectionEvent::Closed { code, reason } => {
                self.engine.on_closed(code, &reason);
                self.socket = None;
            }
        }
        self.flush();
    }

    fn change_listener(&self) -> Option<js_sys::Function> {
        self.listener.clone()
    }
}

/// Sync engine exported to JavaScript.
#[wasm_bindgen]
pub struct BrowserClient {
    host: Rc<RefCell<Host>>,
}

#[wasm_bindgen]
impl BrowserClient {
    /// Create a client. `config` is an engine configuration object;
    /// `undefined` or `null` selects the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<BrowserClient, JsValue> {
        console_error_panic_hook::set_once();
        let config: EngineConfig = if config.is_undefined() || config.is_null() {
            EngineConfig::default()
        } else {
            let raw = js_sys::JSON::stringify(&config).map(String::from)?;
            serde_json::from_str(&raw).map_err(js_error)?
        };
        let engine = SyncEngine::new(
            config,
            Box::new(LocalStorageThemeCache::new()),
            Box::new(DocumentCookieStore::new()),
        );
        Ok(Self {
            host: Rc::new(RefCell::new(Host {
                engine,
                socket: None,
                listener: None,
            })),
        })
    }

    /// Register a function called after every socket event.
    #[wasm_bindgen(js_name = onChange)]
    pub fn on_change(&self, listener: js_sys::Function) {
        self.host.borrow_mut().listener = Some(listener);
    }

    /// Apply the session check result. Returns whether a socket should be
    /// opened.
    pub fn bootstrap(&self, session_ok: bool) -> bool {
        let mut host = self.host.borrow_mut();
        host.engine.bootstrap(session_ok);
        host.engine.should_open()
    }

    /// Open the socket against the page origin.
    pub fn connect(&self) -> Result<(), JsValue> {
        let origin = web_sys::window()
            .ok_or_else(|| JsValue::from_str("no window"))?
            .location()
            .origin()?;
        let url = self.host.borrow_mut().engine.begin_connect(&origin).map_err(js_error)?;
        let handler: Rc<RefCell<dyn SocketHandler>> = self.host.clone();
        match BrowserSocket::connect(url.as_str(), handler) {
            Ok(socket) => {
                self.host.borrow_mut().socket = Some(socket);
                Ok(())
            }
            Err(error) => {
                let mut host = self.host.borrow_mut();
                host.engine.on_transport_error(&error.to_string());
                host.engine.on_closed(None, "connect failed");
                Err(js_error(error))
            }
        }
    }

    /// Send a message on the open socket.
    pub fn send(&self, context: &str, kind: &str, data: JsValue) -> Result<(), JsValue> {
        let domain: Domain = context.parse().map_err(js_error)?;
        let payload = if data.is_undefined() {
            serde_json::Value::Object(Default::default())
        } else {
            let raw = js_sys::JSON::stringify(&data).map(String::from)?;
            serde_json::from_str(&raw).map_err(js_error)?
        };
        let mut host = self.host.borrow_mut();
        host.engine.send(domain, kind, payload).map_err(js_error)?;
        host.flush();
        Ok(())
    }

    /// Log out. Returns the path to navigate to.
    pub fn logout(&self) -> String {
        let mut host = self.host.borrow_mut();
        let path = host.engine.logout();
        host.flush();
        path.to_string()
    }

    /// Count one idle minute. Returns `true` when this ended the session.
    #[wasm_bindgen(js_name = tickSession)]
    pub fn tick_session(&self) -> bool {
        let mut host = self.host.borrow_mut();
        let expired = host.engine.tick_session();
        host.flush();
        expired
    }

    /// Restart the idle countdown.
    #[wasm_bindgen(js_name = touchSession)]
    pub fn touch_session(&self) {
        self.host.borrow_mut().engine.touch_session();
    }

    /// `loading`, `unauthenticated` or `ready`.
    #[wasm_bindgen(js_name = appPhase)]
    pub fn app_phase(&self) -> Result<String, JsValue> {
        let phase = self.host.borrow().engine.app_phase();
        serde_json::to_value(phase)
            .map_err(js_error)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| JsValue::from_str("unexpected phase encoding"))
    }

    /// Route decision for `path`: `{"render": true}`, `{"spinner": true}` or
    /// `{"redirect": "/login"}`.
    #[wasm_bindgen(js_name = resolveRoute)]
    pub fn resolve_route(&self, path: &str) -> String {
        let decision = self.host.borrow().engine.resolve_route(path);
        let value = match decision {
            RouteDecision::Render => serde_json::json!({ "render": true }),
            RouteDecision::Spinner => serde_json::json!({ "spinner": true }),
            RouteDecision::Redirect(to) => serde_json::json!({ "redirect": to }),
        };
        value.to_string()
    }

    /// Synchronized state as JSON.
    #[wasm_bindgen(js_name = stateJson)]
    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.host.borrow().engine.state()).map_err(js_error)
    }

    /// Pending toasts as a JSON array, oldest first. Taking them clears them.
    #[wasm_bindgen(js_name = takeNotifications)]
    pub fn take_notifications(&self) -> Result<String, JsValue> {
        let notifications = self.host.borrow_mut().engine.drain_notifications();
        serde_json::to_string(&notifications).map_err(js_error)
    }

    /// Flips on every close; pages watch it to re-run the session check.
    #[wasm_bindgen(js_name = retryFlag)]
    pub fn retry_flag(&self) -> bool {
        self.host.borrow().engine.retry_flag()
    }

    /// Merge theme tokens (a JSON object) into the local theme.
    #[wasm_bindgen(js_name = updateTheme)]
    pub fn update_theme(&self, tokens_json: &str) -> Result<(), JsValue> {
        let update: Theme = serde_json::from_str(tokens_json).map_err(js_error)?;
        self.host.borrow_mut().engine.update_theme(&update);
        Ok(())
    }

    /// Reset one theme token to its default.
    #[wasm_bindgen(js_name = undoStyle)]
    pub fn undo_style(&self, key: &str) {
        self.host.borrow_mut().engine.undo_style(key);
    }

    /// Send the local theme to the server.
    #[wasm_bindgen(js_name = saveTheme)]
    pub fn save_theme(&self) -> Result<(), JsValue> {
        let mut host = self.host.borrow_mut();
        host.engine.save_theme().map_err(js_error)?;
        host.flush();
        Ok(())
    }

    /// Clear the error and success banners.
    #[wasm_bindgen(js_name = clearResponseState)]
    pub fn clear_response_state(&self) {
        self.host.borrow_mut().engine.clear_response_state();
    }

    /// Clear the focused connection id.
    #[wasm_bindgen(js_name = clearFocusedConnection)]
    pub fn clear_focused_connection(&self) {
        self.host.borrow_mut().engine.clear_focused_connection();
    }
}
