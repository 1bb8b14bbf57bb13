//! Request orchestration
//!
//! [`handle`] runs one benchmark request against an [`Exchange`], the
//! transport-side view of a single stream:
//!
//! - `Sequential` sleeps for the generation time of every non-cached
//!   resource, then sends all of them as one body.
//! - `RawPush` pushes every sub-resource, then sends the primary resource.
//! - `CacheAwarePush` pushes only the sub-resources the session's advisor
//!   approves, then sends the primary resource.
//! - `Plain` sends the primary resource.
//!
//! Outside of `Sequential`, the primary resource costs one `delay` unless
//! the request declares cache hits.
//!
//! Failed pushes and failed writes are not errors of the request: they are
//! logged and recorded in the returned [`Report`].

use std::time::Duration;

use http::Response;
use tracing::{debug, trace, warn};

use crate::body::{BodySink, Emitter};
use crate::push::{candidates, PushCandidate, Session};
use crate::request::{DeliveryMode, ResourceRequest};

/// The transport side of one request/response exchange.
pub trait Exchange {
    /// Sink receiving the response body.
    type Body: BodySink;

    /// Promises and starts delivering one sub-resource.
    fn push(&mut self, candidate: &PushCandidate) -> crate::Result<()>;

    /// Pushes several sub-resources at once, returning one result per
    /// candidate in batch order.
    ///
    /// The default pushes them one by one and carries on past failures.
    fn push_batch(&mut self, batch: &[PushCandidate]) -> Vec<crate::Result<()>> {
        batch.iter().map(|candidate| self.push(candidate)).collect()
    }

    /// Sends the response head and returns the sink for its body.
    fn respond(&mut self, head: Response<()>) -> crate::Result<Self::Body>;
}

/// What happened while handling one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    /// Mode the request was handled in.
    pub mode: DeliveryMode,
    /// Paths a push was attempted for, in order.
    pub pushed: Vec<String>,
    /// Candidates the advisor held back.
    pub skipped: usize,
    /// Push calls that failed.
    pub push_failures: usize,
    /// Simulated generation time slept before responding.
    pub delay: Duration,
    /// Body bytes handed to the transport.
    pub bytes: u64,
    /// Whether the body ended early.
    pub aborted: bool,
}

impl Report {
    fn new(mode: DeliveryMode) -> Report {
        Report {
            mode,
            pushed: Vec::new(),
            skipped: 0,
            push_failures: 0,
            delay: Duration::ZERO,
            bytes: 0,
            aborted: false,
        }
    }
}

/// Handles `req` on `exchange`, consulting `session` for cache-aware push.
pub async fn handle<E>(req: &ResourceRequest, session: &Session, exchange: &mut E) -> Report
where
    E: Exchange,
{
    let mut report = Report::new(req.mode());

    match req.mode() {
        DeliveryMode::Sequential => {
            let misses = req.count().saturating_sub(req.hits());
            let delay = req.delay().checked_mul(misses).unwrap_or(Duration::MAX);
            generate(delay, &mut report).await;
            let total = req.bytes().saturating_mul(u64::from(req.count()));
            deliver(exchange, total, &mut report).await;
            return report;
        }
        DeliveryMode::RawPush => {
            for candidate in candidates(req) {
                if let Err(err) = exchange.push(&candidate) {
                    warn!("failed to push {:?}: {}", candidate.path(), err);
                    report.push_failures += 1;
                }
                report.pushed.push(candidate.path().to_owned());
            }
        }
        DeliveryMode::CacheAwarePush => {
            let batch = candidates(req);
            let offered = batch.len();
            let approved = session.advise(batch);
            report.skipped = offered - approved.len();
            debug!(
                session = session.id(),
                "cache-aware push: {} of {} candidates approved",
                approved.len(),
                offered
            );
            if !approved.is_empty() {
                let results = exchange.push_batch(&approved);
                let mut failed = Vec::new();
                for (candidate, result) in approved.iter().zip(results) {
                    if let Err(err) = result {
                        warn!("failed to push {:?}: {}", candidate.path(), err);
                        failed.push(candidate.clone());
                    }
                }
                // never delivered, so not in the client's cache either
                if !failed.is_empty() {
                    session.forget(&failed);
                }
                report.push_failures = failed.len();
                report.pushed = paths(&approved);
            }
        }
        DeliveryMode::Plain => (),
    }

    if req.hits() == 0 {
        generate(req.delay(), &mut report).await;
    }
    deliver(exchange, req.bytes(), &mut report).await;
    report
}

async fn generate(delay: Duration, report: &mut Report) {
    if delay.is_zero() {
        return;
    }
    trace!("simulating generation for {:?}", delay);
    tokio::time::sleep(delay).await;
    report.delay = delay;
}

async fn deliver<E>(exchange: &mut E, total: u64, report: &mut Report)
where
    E: Exchange,
{
    let mut emitter = Emitter::new(total);
    let result = match exchange.respond(emitter.head()) {
        Ok(mut body) => emitter.emit(&mut body).await,
        Err(err) => Err(err),
    };
    report.bytes = emitter.written();

    match result {
        Ok(()) => trace!("body complete: {} bytes", emitter.total()),
        Err(err) if err.is_body_write() => {
            debug!(
                "peer went away after {} of {} bytes: {}",
                emitter.written(),
                emitter.total(),
                err
            );
            report.aborted = true;
        }
        Err(err) => {
            warn!(
                "response aborted after {} of {} bytes: {}",
                emitter.written(),
                emitter.total(),
                err
            );
            report.aborted = true;
        }
    }
}

fn paths(batch: &[PushCandidate]) -> Vec<String> {
    batch.iter().map(|c| c.path().to_owned()).collect()
}
