use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use h2::server::SendResponse;
use h2::RecvStream;
use http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Request, Response, StatusCode};
use tracing::debug;

use super::files;
use crate::body::accepts_gzip;
use crate::orchestrator;
use crate::proto::h2::send_full;
use crate::proto::h2::server::H2Exchange;
use crate::push::{Session, DEFAULT_CAPACITY};
use crate::request::{ResourceRequest, API_PATH};

/// Routes requests to the benchmark endpoint or to static files.
#[derive(Clone, Debug)]
pub struct Service {
    compress: bool,
    push_capacity: usize,
    idle_timeout: Option<Duration>,
    static_dir: Arc<Path>,
}

impl Service {
    /// Creates a service serving static files from `static_dir`.
    pub fn new(static_dir: impl Into<PathBuf>) -> Service {
        Service {
            compress: false,
            push_capacity: DEFAULT_CAPACITY,
            idle_timeout: None,
            static_dir: Arc::from(static_dir.into()),
        }
    }

    /// Sets whether benchmark responses are gzip encoded for clients that
    /// accept it.
    ///
    /// Default is `false`.
    pub fn compress(mut self, enabled: bool) -> Service {
        self.compress = enabled;
        self
    }

    /// Sets how many pushed resources each connection remembers for
    /// cache-aware push.
    pub fn push_capacity(mut self, capacity: usize) -> Service {
        self.push_capacity = capacity;
        self
    }

    /// Sets how long a connection may go without streams in flight before
    /// it is shut down. `None` keeps idle connections open.
    ///
    /// Default is `None`.
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Service {
        self.idle_timeout = timeout;
        self
    }

    pub(crate) fn session_capacity(&self) -> usize {
        self.push_capacity
    }

    pub(crate) fn idle(&self) -> Option<Duration> {
        self.idle_timeout
    }

    pub(crate) async fn call(
        &self,
        req: Request<RecvStream>,
        mut respond: SendResponse<Bytes>,
        session: Arc<Session>,
    ) {
        if req.uri().path() == API_PATH {
            return self.benchmark(req, respond, session).await;
        }

        let res = files::serve(&self.static_dir, req.method(), req.uri().path()).await;
        debug!(status = res.status().as_u16(), "static response");
        if let Err(err) = send_full(&mut respond, res) {
            debug!("failed to send static response: {}", err);
        }
    }

    async fn benchmark(
        &self,
        req: Request<RecvStream>,
        mut respond: SendResponse<Bytes>,
        session: Arc<Session>,
    ) {
        let resource = match ResourceRequest::from_query(req.uri().query().unwrap_or("")) {
            Ok(resource) => resource,
            Err(err) => {
                debug!("rejecting request: {}", err);
                let res = text(StatusCode::BAD_REQUEST, &err.to_string());
                if let Err(err) = send_full(&mut respond, res) {
                    debug!("failed to send error response: {}", err);
                }
                return;
            }
        };

        let gzip = self.compress && accepts_gzip(req.headers());
        let mut exchange = H2Exchange::new(&req, respond, gzip, session.clone());
        let report = orchestrator::handle(&resource, &session, &mut exchange).await;
        debug!(
            mode = %report.mode,
            pushed = report.pushed.len(),
            skipped = report.skipped,
            bytes = report.bytes,
            aborted = report.aborted,
            "request complete"
        );
    }
}

/// A plain text response with a trailing newline.
pub(super) fn text(status: StatusCode, msg: &str) -> Response<Bytes> {
    let body = Bytes::from(format!("{}\n", msg));
    let len = body.len();
    let mut res = Response::new(body);
    *res.status_mut() = status;
    res.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    res.headers_mut()
        .insert(CONTENT_LENGTH, HeaderValue::from(len));
    res
}
