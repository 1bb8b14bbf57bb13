use std::task::{ready, Context, Poll};

use bytes::Bytes;
use h2::server::SendResponse;
use h2::SendStream;
use http::Response;
use tracing::{debug, trace};

use crate::body::{BodySink, CHUNK_SIZE};

pub(crate) mod server;

/// Body sink writing DATA frames on one h2 stream.
pub(crate) struct H2Sink {
    body_tx: SendStream<Bytes>,
}

impl H2Sink {
    pub(crate) fn new(body_tx: SendStream<Bytes>) -> H2Sink {
        H2Sink { body_tx }
    }
}

impl BodySink for H2Sink {
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<crate::Result<()>> {
        // h2 handles the capacity management for the actual chunk, this only
        // waits until the peer's window has some room.
        self.body_tx.reserve_capacity(CHUNK_SIZE);

        if self.body_tx.capacity() == 0 {
            loop {
                match ready!(self.body_tx.poll_capacity(cx)) {
                    Some(Ok(0)) => {}
                    Some(Ok(_)) => break,
                    Some(Err(err)) => return Poll::Ready(Err(crate::Error::new_body_write(err))),
                    None => {
                        return Poll::Ready(Err(crate::Error::new_body_write(
                            "send stream closed",
                        )))
                    }
                }
            }
        } else if let Poll::Ready(reason) = self
            .body_tx
            .poll_reset(cx)
            .map_err(crate::Error::new_body_write)?
        {
            debug!("stream received RST_STREAM: {:?}", reason);
            return Poll::Ready(Err(crate::Error::new_body_write(h2::Error::from(reason))));
        }
        Poll::Ready(Ok(()))
    }

    fn send_chunk(&mut self, chunk: Bytes, end_of_stream: bool) -> crate::Result<()> {
        trace!("send data frame: {} bytes, eos={}", chunk.len(), end_of_stream);
        self.body_tx
            .send_data(chunk, end_of_stream)
            .map_err(crate::Error::new_body_write)
    }
}

/// Sends a complete, buffered response.
pub(crate) fn send_full(respond: &mut SendResponse<Bytes>, res: Response<Bytes>) -> crate::Result<()> {
    let (parts, body) = res.into_parts();
    let head = Response::from_parts(parts, ());
    if body.is_empty() {
        respond
            .send_response(head, true)
            .map_err(crate::Error::new_body_write)?;
        return Ok(());
    }
    let mut body_tx = respond
        .send_response(head, false)
        .map_err(crate::Error::new_body_write)?;
    body_tx
        .send_data(body, true)
        .map_err(crate::Error::new_body_write)
}
