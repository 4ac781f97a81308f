//! Minimal HTTP server for tests. Requests have to be anticipated before they arrive, and are
//! responded to explicitly, which lets tests control exactly when each response comes.

use http_body_util::Full;
use hyper::{Request, Response, server::conn::http1, service::Service};
use hyper_util::rt::TokioIo;
use std::{
    collections::HashMap,
    future::Future,
    net::SocketAddr,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard},
};
use tokio::{net::TcpListener, sync::oneshot};

pub use hyper;
pub use hyper::StatusCode;
pub use hyper::body::Bytes;
pub use hyper::http::request::Parts;

type Body = Full<Bytes>;

struct Anticipation {
    request_tx: oneshot::Sender<Parts>,
    response_rx: oneshot::Receiver<Response<Body>>,
}

#[derive(Default)]
struct State {
    /// Requests announced with [`Server::anticipate`], keyed by path.
    anticipated: HashMap<String, Anticipation>,

    unexpected: Vec<String>,
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().expect("hypermocker state poisoned")
}

pub struct Server {
    port: u16,
    state: Arc<Mutex<State>>,
}

impl Server {
    /// Create new [`Server`], and bind it to a random port.
    pub async fn bind() -> Server {
        let state = Arc::new(Mutex::new(State::default()));

        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = TcpListener::bind(addr)
            .await
            .expect("could not bind the mock server");
        let port = listener
            .local_addr()
            .expect("mock server has no address")
            .port();

        let state_clone = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let io = TokioIo::new(stream);
                let state = state_clone.clone();

                tokio::task::spawn(async move {
                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, Connection { state })
                        .await
                    {
                        log::debug!("Connection ended with: {err}");
                    }
                });
            }
        });

        Server { port, state }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Announce that a request for `path` is going to come.
    pub async fn anticipate(&self, path: impl Into<String>) -> AnticipatedRequest {
        let path = path.into();
        log::info!("Anticipating '{path}'.");

        let (request_tx, request_rx) = oneshot::channel();
        let (response_tx, response_rx) = oneshot::channel();

        lock(&self.state).anticipated.insert(
            path.clone(),
            Anticipation {
                request_tx,
                response_rx,
            },
        );

        AnticipatedRequest {
            path,
            request_rx,
            response_tx,
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let state = lock(&self.state);
        if !state.unexpected.is_empty() && !std::thread::panicking() {
            panic!("there are unexpected requests: {:?}", state.unexpected);
        }
    }
}

pub struct AnticipatedRequest {
    path: String,
    request_rx: oneshot::Receiver<Parts>,
    response_tx: oneshot::Sender<Response<Body>>,
}

#[allow(clippy::unused_async)]
impl AnticipatedRequest {
    /// Wait for the request to arrive.
    pub async fn expect(&mut self) -> Parts {
        log::info!("Waiting for '{}'.", self.path);
        (&mut self.request_rx)
            .await
            .expect("server went down before the request came")
    }

    /// Respond with 200 and the given body.
    pub async fn respond(self, body: impl Into<Bytes>) {
        self.send(Response::new(Full::new(body.into())));
    }

    /// Respond with an empty body and the given status.
    pub async fn respond_with_status(self, status: StatusCode) {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = status;
        self.send(response);
    }

    fn send(self, response: Response<Body>) {
        log::info!("Responding to '{}' with {}.", self.path, response.status());
        if self.response_tx.send(response).is_err() {
            log::warn!("Nobody waits for '{}' anymore.", self.path);
        }
    }
}

struct Connection {
    state: Arc<Mutex<State>>,
}

impl Service<Request<hyper::body::Incoming>> for Connection {
    type Response = Response<Body>;
    type Error = hyper::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, request: Request<hyper::body::Incoming>) -> Self::Future {
        log::info!("Incoming request '{}'.", request.uri());
        let state = self.state.clone();

        Box::pin(async move {
            let (parts, _) = request.into_parts();
            let anticipation = lock(&state).anticipated.remove(parts.uri.path());

            let Some(anticipation) = anticipation else {
                log::warn!("Unexpected '{}'.", parts.uri);
                lock(&state).unexpected.push(parts.uri.to_string());

                let mut response = Response::new(Full::new(Bytes::from_static(b"unexpected")));
                *response.status_mut() = StatusCode::IM_A_TEAPOT;
                return Ok(response);
            };

            // The test might not be interested in the request itself.
            let _ = anticipation.request_tx.send(parts);

            Ok(anticipation.response_rx.await.unwrap_or_else(|_| {
                let mut response = Response::new(Full::new(Bytes::new()));
                *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
                response
            }))
        })
    }
}
