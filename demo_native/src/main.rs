//! Desktop host. Draw mode is given as the first argument (`type=Polygon`), configuration is read
//! from the file or URL in `PICKMAP_CONFIG` (`config.hjson` by default). Results are printed to
//! stdout as JSON lines, and every line of stdin is treated as a message from the host, except
//! `submit`, which confirms the dialog.

#[cfg(not(target_arch = "wasm32"))]
mod stdio {
    use std::io::{BufRead, Write};

    use futures::channel::mpsc::UnboundedSender;
    use pickmap::{HostChannel, HostEvent};

    /// Posts messages as lines of the standard output.
    pub struct Stdout;

    impl HostChannel for Stdout {
        fn post(&self, message: &str, _target_origin: &str) {
            let mut stdout = std::io::stdout().lock();
            if let Err(err) = writeln!(stdout, "{message}").and_then(|()| stdout.flush()) {
                log::error!("Could not write the result: {err}");
            }
        }
    }

    /// Forward lines of the standard input to the widget, until it ends.
    pub fn forward_stdin(inbox: UnboundedSender<HostEvent>, egui_ctx: egui::Context) {
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        log::warn!("Could not read stdin: {err}");
                        break;
                    }
                };

                let event = match line.trim() {
                    "" => continue,
                    "submit" => HostEvent::Submit,
                    message => HostEvent::Message(message.to_owned()),
                };

                if inbox.unbounded_send(event).is_err() {
                    break;
                }
                egui_ctx.request_repaint();
            }
            log::debug!("Stdin closed.");
        });
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), eframe::Error> {
    use demo::PickApp;
    use pickmap::PickWidget;

    env_logger::init();

    let query = std::env::args().nth(1).unwrap_or_default();
    let config = std::env::var("PICKMAP_CONFIG").unwrap_or_else(|_| "config.hjson".to_owned());

    eframe::run_native(
        "pickmap",
        Default::default(),
        Box::new(move |cc| {
            let (inbox_tx, inbox_rx) = futures::channel::mpsc::unbounded();
            stdio::forward_stdin(inbox_tx, cc.egui_ctx.clone());

            let mut widget = PickWidget::new(cc.egui_ctx.clone(), stdio::Stdout)
                .with_query(query)
                .with_inbox(inbox_rx);
            widget.load_config(&config);

            Ok(Box::new(PickApp::new(widget)))
        }),
    )
}

#[cfg(target_arch = "wasm32")]
fn main() {
    log::error!("This host is not meant to be compiled for WASM.");
}
