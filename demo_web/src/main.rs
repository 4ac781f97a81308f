//! Browser host. The widget runs inside an iframe: draw mode comes from `location.search`,
//! configuration from `config.hjson` next to the page, results are posted to the parent window
//! and its messages are passed to the widget. `submit()` is exported for the page's scripts.

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;

    use eframe::egui;
    use futures::channel::mpsc::UnboundedSender;
    use pickmap::{HostChannel, HostEvent};
    use wasm_bindgen::{JsCast, JsValue, closure::Closure, prelude::wasm_bindgen};

    thread_local! {
        /// Inbox of the widget, for the exported functions.
        static INBOX: RefCell<Option<UnboundedSender<HostEvent>>> = const { RefCell::new(None) };
    }

    /// Posts messages to the parent window.
    pub struct ParentWindow;

    impl HostChannel for ParentWindow {
        fn post(&self, message: &str, target_origin: &str) {
            let Some(parent) = web_sys::window().and_then(|window| window.parent().ok().flatten())
            else {
                log::warn!("There is no parent window to post to.");
                return;
            };

            if let Err(err) = parent.post_message(&JsValue::from_str(message), target_origin) {
                log::error!("Could not post the message: {err:?}");
            }
        }
    }

    /// Confirm the dialog, same as its submit button.
    #[wasm_bindgen]
    pub fn submit() {
        send(HostEvent::Submit);
    }

    fn send(event: HostEvent) {
        INBOX.with_borrow(|inbox| {
            if let Some(inbox) = inbox
                && inbox.unbounded_send(event).is_err()
            {
                log::warn!("Widget is gone.");
            }
        });
    }

    pub fn set_inbox(inbox: UnboundedSender<HostEvent>) {
        INBOX.set(Some(inbox));
    }

    /// Pass string messages of the window to the widget.
    pub fn listen_to_messages(egui_ctx: egui::Context) -> Result<(), JsValue> {
        let window = web_sys::window().ok_or("no window")?;

        let listener = Closure::<dyn FnMut(web_sys::MessageEvent)>::new(
            move |event: web_sys::MessageEvent| match event.data().as_string() {
                Some(text) => {
                    send(HostEvent::Message(text));
                    egui_ctx.request_repaint();
                }
                None => log::debug!("Ignoring non-text message."),
            },
        );

        window.add_event_listener_with_callback("message", listener.as_ref().unchecked_ref())?;
        // Listens for as long as the page lives.
        listener.forget();
        Ok(())
    }

    /// Query string of the page and the absolute URL of the configuration.
    pub fn location() -> Result<(String, String), JsValue> {
        let location = web_sys::window().ok_or("no window")?.location();
        let search = location.search()?;
        let page = url::Url::parse(&location.href()?).map_err(|err| err.to_string())?;
        let config = page.join("config.hjson").map_err(|err| err.to_string())?;
        Ok((search, config.into()))
    }

    pub fn canvas() -> Result<web_sys::HtmlCanvasElement, JsValue> {
        web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.get_element_by_id("map"))
            .ok_or("there is no element with id 'map'")?
            .dyn_into::<web_sys::HtmlCanvasElement>()
            .map_err(|_element| JsValue::from_str("'map' is not a canvas"))
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    use demo::PickApp;
    use pickmap::PickWidget;

    // Redirect `log` message to `console.log` and friends:
    eframe::WebLogger::init(log::LevelFilter::Debug).ok();

    wasm_bindgen_futures::spawn_local(async {
        let found = web::canvas().and_then(|canvas| Ok((canvas, web::location()?)));
        let (canvas, (query, config)) = match found {
            Ok(found) => found,
            Err(err) => {
                log::error!("Could not start: {err:?}");
                return;
            }
        };

        let start = eframe::WebRunner::new()
            .start(
                canvas,
                eframe::WebOptions::default(),
                Box::new(move |cc| {
                    let (inbox_tx, inbox_rx) = futures::channel::mpsc::unbounded();
                    web::set_inbox(inbox_tx);
                    if let Err(err) = web::listen_to_messages(cc.egui_ctx.clone()) {
                        log::error!("Could not listen to messages: {err:?}");
                    }

                    let mut widget = PickWidget::new(cc.egui_ctx.clone(), web::ParentWindow)
                        .with_query(query)
                        .with_inbox(inbox_rx);
                    widget.load_config(&config);

                    Ok(Box::new(PickApp::new(widget)))
                }),
            )
            .await;

        if let Err(err) = start {
            log::error!("Failed to start eframe: {err:?}");
        }
    });
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    log::error!("This host is only meant to be compiled for WASM.");
}
