use futures_util::future::poll_fn;
use http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Response, StatusCode};
use tracing::trace;

use super::{BodySink, Bytes};

/// Size of every chunk but the last one.
pub const CHUNK_SIZE: usize = 1024;

static FILLER: [u8; CHUNK_SIZE] = [b'x'; CHUNK_SIZE];

/// Builds the response head declaring a body of `total` bytes.
pub fn head(total: u64) -> Response<()> {
    let mut res = Response::new(());
    *res.status_mut() = StatusCode::OK;
    let headers = res.headers_mut();
    headers.insert(CONTENT_LENGTH, HeaderValue::from(total));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    res
}

/// The chunks making up a filler body: full `CHUNK_SIZE` pieces followed
/// by one partial piece of `total % CHUNK_SIZE` bytes, if nonzero.
#[derive(Clone, Debug)]
pub struct Chunks {
    remaining: u64,
}

impl Chunks {
    /// Splits a body of `total` bytes.
    pub fn new(total: u64) -> Chunks {
        Chunks { remaining: total }
    }

    /// Bytes not yet yielded.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Iterator for Chunks {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        if self.remaining == 0 {
            return None;
        }
        let len = self.remaining.min(CHUNK_SIZE as u64) as usize;
        self.remaining -= len as u64;
        Some(Bytes::from_static(&FILLER[..len]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining.div_ceil(CHUNK_SIZE as u64);
        let n = usize::try_from(n).unwrap_or(usize::MAX);
        (n, Some(n))
    }
}

/// Writes a filler body into a `BodySink`.
#[derive(Debug)]
pub struct Emitter {
    total: u64,
    written: u64,
}

impl Emitter {
    /// Creates an emitter for a body of exactly `total` bytes.
    pub fn new(total: u64) -> Emitter {
        Emitter { total, written: 0 }
    }

    /// The response head matching this body.
    pub fn head(&self) -> Response<()> {
        head(self.total)
    }

    /// Bytes declared for this body.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Bytes handed to the sink so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Writes the whole body, one chunk at a time. An empty body is a
    /// single empty end-of-stream chunk.
    ///
    /// Stops at the first failed write; the bytes already written stay
    /// counted in `written()`.
    pub async fn emit<S>(&mut self, sink: &mut S) -> crate::Result<()>
    where
        S: BodySink + ?Sized,
    {
        let mut chunks = Chunks::new(self.total);
        if self.total == 0 {
            poll_fn(|cx| sink.poll_ready(cx)).await?;
            return sink.send_chunk(Bytes::new(), true);
        }

        while let Some(chunk) = chunks.next() {
            poll_fn(|cx| sink.poll_ready(cx)).await?;
            let len = chunk.len() as u64;
            let eos = chunks.remaining() == 0;
            trace!("send body chunk: {} bytes, eos={}", len, eos);
            sink.send_chunk(chunk, eos)?;
            self.written += len;
        }
        Ok(())
    }
}
