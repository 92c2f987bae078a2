//! Browser websocket transport over `web_sys::WebSocket`.
//!
//! Callbacks are installed once per socket and forwarded to a shared
//! [`SocketHandler`]. The handler is borrowed only for the duration of the
//! event; its change listener runs after the borrow is released so it may
//! call back into the client.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{BinaryType, CloseEvent, Event, MessageEvent, WebSocket};

use super::{ConnectionEvent, TransportError};

/// Receives socket events.
pub trait SocketHandler {
    /// Apply one event.
    fn handle(&mut self, event: ConnectionEvent);

    /// Callback to run once the event has been applied.
    fn change_listener(&self) -> Option<js_sys::Function>;
}

/// An open browser socket.
#[derive(Debug)]
pub struct BrowserSocket {
    socket: WebSocket,
}

fn deliver(handler: &Rc<RefCell<dyn SocketHandler>>, event: ConnectionEvent) {
    handler.borrow_mut().handle(event);
    let listener = handler.borrow().change_listener();
    if let Some(listener) = listener {
        if let Err(error) = listener.call0(&JsValue::NULL) {
            tracing::warn!(?error, "change listener threw");
        }
    }
}

impl BrowserSocket {
    /// Open a socket to `url`. The browser sends the page cookies on the
    /// upgrade request.
    pub fn connect(url: &str, handler: Rc<RefCell<dyn SocketHandler>>) -> Result<Self, TransportError> {
        let socket = WebSocket::new(url).map_err(|e| TransportError::Connect(format!("{e:?}")))?;
        socket.set_binary_type(BinaryType::Arraybuffer);

        {
            let handler = handler.clone();
            let onopen: Closure<dyn Fn()> = Closure::new(move || deliver(&handler, ConnectionEvent::Ready));
            socket.set_onopen(Some(onopen.as_ref().unchecked_ref()));
            onopen.forget();
        }

        {
            let handler = handler.clone();
            let onmessage: Closure<dyn Fn(MessageEvent)> = Closure::new(move |event: MessageEvent| {
                match event.data().dyn_into::<js_sys::JsString>() {
                    Ok(text) => deliver(&handler, ConnectionEvent::Message(String::from(text))),
                    Err(_) => tracing::debug!("dropping non-text frame"),
                }
            });
            socket.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
            onmessage.forget();
        }

        {
            let handler = handler.clone();
            let onclose: Closure<dyn Fn(CloseEvent)> = Closure::new(move |event: CloseEvent| {
                deliver(
                    &handler,
                    ConnectionEvent::Closed {
                        code: Some(event.code()),
                        reason: event.reason(),
                    },
                );
            });
            socket.set_onclose(Some(onclose.as_ref().unchecked_ref()));
            onclose.forget();
        }

        {
            // Socket errors arrive as a plain `Event` with no message.
            let onerror: Closure<dyn Fn(Event)> = Closure::new(move |event: Event| {
                deliver(&handler, ConnectionEvent::TransportError(format!("websocket {}", event.type_())));
            });
            socket.set_onerror(Some(onerror.as_ref().unchecked_ref()));
            onerror.forget();
        }

        Ok(Self { socket })
    }

    /// Send one text frame.
    pub fn send(&self, text: &str) -> Result<(), TransportError> {
        self.socket
            .send_with_str(text)
            .map_err(|e| TransportError::Send(format!("{e:?}")))
    }

    /// Close with a normal close code.
    pub fn close(&self) {
        if let Err(error) = self.socket.close_with_code_and_reason(1000, "logout") {
            tracing::warn!(?error, "websocket close failed");
        }
    }
}
