//! IO runtime shared by the configuration loader and the tile downloads. Concrete implementation
//! depends on the target.

#[cfg(not(target_arch = "wasm32"))]
pub(crate) use native::*;

#[cfg(target_arch = "wasm32")]
pub(crate) use web::*;

#[cfg(target_arch = "wasm32")]
mod web {
    /// Browser's event loop is the runtime.
    #[derive(Clone, Default)]
    pub struct Runtime;

    impl Runtime {
        pub fn new() -> Self {
            Self
        }

        pub fn spawn<F>(&self, f: F)
        where
            F: std::future::Future<Output = ()> + 'static,
        {
            wasm_bindgen_futures::spawn_local(f);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;

    type Task = Pin<Box<dyn Future<Output = ()> + Send>>;

    /// Handle to a thread running current-thread Tokio runtime. The thread is stopped when the
    /// last handle is dropped, together with all tasks still running on it.
    #[derive(Clone)]
    pub struct Runtime(Arc<Thread>);

    struct Thread {
        join_handle: Option<std::thread::JoinHandle<()>>,
        task_tx: Option<tokio::sync::mpsc::UnboundedSender<Task>>,
    }

    impl Runtime {
        pub fn new() -> Self {
            let (task_tx, mut task_rx) = tokio::sync::mpsc::unbounded_channel::<Task>();

            let join_handle = std::thread::spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        log::error!("Could not create the Tokio runtime, IO will not work: {err}");
                        return;
                    }
                };

                runtime.block_on(async {
                    while let Some(task) = task_rx.recv().await {
                        tokio::spawn(task);
                    }
                });
            });

            Self(Arc::new(Thread {
                join_handle: Some(join_handle),
                task_tx: Some(task_tx),
            }))
        }

        pub fn spawn<F>(&self, f: F)
        where
            F: Future<Output = ()> + Send + 'static,
        {
            let sent = self
                .0
                .task_tx
                .as_ref()
                .is_some_and(|task_tx| task_tx.send(Box::pin(f)).is_ok());

            if !sent {
                log::error!("IO runtime is down.");
            }
        }
    }

    impl Default for Runtime {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for Thread {
        fn drop(&mut self) {
            // Closing the channel ends the loop. Tokio thread might be dead already, nothing to
            // do in this case.
            drop(self.task_tx.take());

            if let Some(join_handle) = self.join_handle.take() {
                log::debug!("Waiting for the Tokio thread to exit.");
                let _ = join_handle.join();
            }

            log::debug!("Tokio thread is down.");
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn spawned_task_runs_on_the_io_thread() {
            let runtime = Runtime::new();
            let (tx, rx) = std::sync::mpsc::channel();

            runtime.spawn(async move {
                tx.send(std::thread::current().id()).unwrap();
            });

            let io_thread = rx.recv().unwrap();
            assert_ne!(io_thread, std::thread::current().id());
        }

        #[test]
        fn dropping_last_handle_stops_the_thread() {
            let runtime = Runtime::new();
            let clone = runtime.clone();
            drop(runtime);

            let (tx, rx) = std::sync::mpsc::channel();
            clone.spawn(async move {
                tx.send(()).unwrap();
            });
            rx.recv().unwrap();

            drop(clone);
        }
    }
}
