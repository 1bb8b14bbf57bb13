use std::sync::Arc;

use bytes::Bytes;
use h2::server::{Builder, Connection, SendPushedResponse, SendResponse};
use http::header::{HeaderValue, ACCEPT_ENCODING};
use http::uri::{Authority, Scheme};
use http::{Request, Response, Uri};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, debug_span, trace, Instrument};

use super::H2Sink;
use crate::body::{encode_head, BodySink, GzipSink};
use crate::orchestrator::{self, Exchange};
use crate::push::{PushCandidate, Session};
use crate::request::ResourceRequest;
use crate::server::Service;

/// Performs the h2 server handshake on `io`.
pub(crate) async fn handshake<T>(io: T, builder: &Builder) -> crate::Result<Connection<T, Bytes>>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    builder.handshake(io).await.map_err(crate::Error::new_h2)
}

/// Accepts streams on `conn` until the peer goes away, handling each one
/// in its own task.
///
/// All streams of the connection share one `Session`. With an idle timeout
/// configured, a connection without streams in flight for that long is shut
/// down gracefully.
pub(crate) async fn serve<T>(mut conn: Connection<T, Bytes>, service: Service) -> crate::Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let session = Arc::new(Session::new(service.session_capacity()));
    debug!(session = session.id(), "http2 connection established");

    // one clone per stream in flight
    let active = Arc::new(());
    let mut closing = false;

    loop {
        let next = match service.idle() {
            Some(idle) if !closing => match tokio::time::timeout(idle, conn.accept()).await {
                Ok(next) => next,
                Err(_) => {
                    if Arc::strong_count(&active) == 1 {
                        debug!("closing connection idle for {:?}", idle);
                        conn.graceful_shutdown();
                        closing = true;
                    }
                    continue;
                }
            },
            _ => conn.accept().await,
        };
        let Some(accepted) = next else {
            break;
        };

        let (req, respond) = accepted.map_err(crate::Error::new_h2)?;
        trace!("incoming request");
        let span = debug_span!("stream", path = %req.uri().path());
        let service = service.clone();
        let session = session.clone();
        let active = active.clone();
        tokio::spawn(
            async move {
                service.call(req, respond, session).await;
                drop(active);
            }
            .instrument(span),
        );
    }

    trace!("incoming connection complete");
    Ok(())
}

/// Runs the handshake and serves the connection.
pub async fn serve_connection<T>(io: T, builder: &Builder, service: Service) -> crate::Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let conn = handshake(io, builder).await?;
    serve(conn, service).await
}

enum Reply {
    Stream(SendResponse<Bytes>),
    Pushed(SendPushedResponse<Bytes>),
}

/// One h2 stream seen as an orchestrator `Exchange`.
pub(crate) struct H2Exchange {
    reply: Reply,
    scheme: Scheme,
    authority: Option<Authority>,
    accept_encoding: Option<HeaderValue>,
    gzip: bool,
    session: Arc<Session>,
}

impl H2Exchange {
    pub(crate) fn new<B>(
        req: &Request<B>,
        respond: SendResponse<Bytes>,
        gzip: bool,
        session: Arc<Session>,
    ) -> H2Exchange {
        H2Exchange {
            reply: Reply::Stream(respond),
            scheme: req.uri().scheme().cloned().unwrap_or(Scheme::HTTPS),
            authority: req.uri().authority().cloned(),
            accept_encoding: req.headers().get(ACCEPT_ENCODING).cloned(),
            gzip,
            session,
        }
    }

    fn promised_uri(&self, candidate: &PushCandidate) -> crate::Result<Uri> {
        let authority = self
            .authority
            .clone()
            .ok_or_else(|| crate::Error::new_push("request has no authority"))?;
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(authority)
            .path_and_query(candidate.path())
            .build()
            .map_err(crate::Error::new_push)
    }

    fn pushed(&self, reply: SendPushedResponse<Bytes>) -> H2Exchange {
        H2Exchange {
            reply: Reply::Pushed(reply),
            scheme: self.scheme.clone(),
            authority: self.authority.clone(),
            accept_encoding: self.accept_encoding.clone(),
            gzip: self.gzip,
            session: self.session.clone(),
        }
    }
}

impl Exchange for H2Exchange {
    type Body = Box<dyn BodySink + Send>;

    fn push(&mut self, candidate: &PushCandidate) -> crate::Result<()> {
        let sub = ResourceRequest::from_query(candidate.query())?;
        let mut promise = Request::get(self.promised_uri(candidate)?)
            .body(())
            .map_err(crate::Error::new_push)?;
        if let Some(ref accept_encoding) = self.accept_encoding {
            promise
                .headers_mut()
                .insert(ACCEPT_ENCODING, accept_encoding.clone());
        }

        let pushed = match self.reply {
            Reply::Stream(ref mut respond) => respond
                .push_request(promise)
                .map_err(crate::Error::new_push)?,
            Reply::Pushed(_) => return Err(crate::Error::new_push("pushed streams cannot push")),
        };
        trace!("push promised: {}", candidate);

        let mut exchange = self.pushed(pushed);
        let span = debug_span!("pushed", id = sub.id().unwrap_or_default());
        tokio::spawn(
            async move {
                let session = exchange.session.clone();
                let report = orchestrator::handle(&sub, &session, &mut exchange).await;
                trace!(?report, "pushed stream complete");
            }
            .instrument(span),
        );
        Ok(())
    }

    fn respond(&mut self, mut head: Response<()>) -> crate::Result<Self::Body> {
        if self.gzip {
            encode_head(&mut head);
        }
        let body_tx = match self.reply {
            Reply::Stream(ref mut respond) => respond.send_response(head, false),
            Reply::Pushed(ref mut respond) => respond.send_response(head, false),
        }
        .map_err(crate::Error::new_body_write)?;

        let sink = H2Sink::new(body_tx);
        if self.gzip {
            Ok(Box::new(GzipSink::new(sink)))
        } else {
            Ok(Box::new(sink))
        }
    }
}
