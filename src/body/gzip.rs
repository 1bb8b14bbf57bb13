use std::fmt;
use std::io::Write;
use std::mem;
use std::task::{Context, Poll};

use flate2::write::GzEncoder;
use flate2::Compression;
use http::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, VARY};
use http::Response;

use super::{BodySink, Bytes};

/// A `BodySink` that gzips every chunk before passing it on.
///
/// Each chunk is sync-flushed, so the client can decode everything it has
/// received so far.
pub struct GzipSink<S> {
    inner: S,
    encoder: GzEncoder<Vec<u8>>,
}

impl<S> GzipSink<S> {
    /// Wraps `inner` with a fresh encoder.
    pub fn new(inner: S) -> GzipSink<S> {
        GzipSink {
            inner,
            encoder: GzEncoder::new(Vec::new(), Compression::default()),
        }
    }

    /// Consumes the wrapper, returning the inner sink.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: fmt::Debug> fmt::Debug for GzipSink<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GzipSink")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<S: BodySink> BodySink for GzipSink<S> {
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<crate::Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn send_chunk(&mut self, chunk: Bytes, end_of_stream: bool) -> crate::Result<()> {
        self.encoder
            .write_all(&chunk)
            .map_err(crate::Error::new_body_write)?;
        let flushed = if end_of_stream {
            self.encoder.try_finish()
        } else {
            self.encoder.flush()
        };
        flushed.map_err(crate::Error::new_body_write)?;

        let out = mem::take(self.encoder.get_mut());
        if out.is_empty() && !end_of_stream {
            return Ok(());
        }
        self.inner.send_chunk(Bytes::from(out), end_of_stream)
    }
}

/// Whether the request's `accept-encoding` allows gzip.
pub fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|coding| {
            let mut parts = coding.split(';').map(str::trim);
            let name = parts.next().unwrap_or("");
            let refused = parts.any(|p| {
                p.strip_prefix("q=")
                    .and_then(|q| q.parse::<f32>().ok())
                    .map_or(false, |q| q == 0.0)
            });
            (name.eq_ignore_ascii_case("gzip") || name == "*") && !refused
        })
}

/// Rewrites a response head for a gzipped body.
///
/// The compressed length is unknown up front, so `content-length` is dropped.
pub fn encode_head(res: &mut Response<()>) {
    let headers = res.headers_mut();
    headers.remove(CONTENT_LENGTH);
    headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    headers.append(VARY, HeaderValue::from_static("accept-encoding"));
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::GzDecoder;

    use super::*;
    use crate::body::Emitter;
    use crate::mock::VecSink;

    #[tokio::test]
    async fn gzip_sink_round_trips_payload() {
        let mut sink = GzipSink::new(VecSink::default());
        let mut emitter = Emitter::new(2500);
        emitter.emit(&mut sink).await.expect("emit");
        assert_eq!(emitter.written(), 2500);

        let inner = sink.into_inner();
        assert!(inner.chunks.last().expect("chunks").1);
        let wire: Vec<u8> = inner
            .chunks
            .iter()
            .flat_map(|(c, _)| c.iter().copied())
            .collect();

        let mut decoded = String::new();
        GzDecoder::new(&wire[..])
            .read_to_string(&mut decoded)
            .expect("gunzip");
        assert_eq!(decoded.len(), 2500);
        assert!(decoded.bytes().all(|b| b == b'x'));
    }

    #[test]
    fn accept_encoding_negotiation() {
        let mut headers = HeaderMap::new();
        assert!(!accepts_gzip(&headers));

        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("br, gzip;q=0.8"));
        assert!(accepts_gzip(&headers));

        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip;q=0, br"));
        assert!(!accepts_gzip(&headers));

        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        assert!(!accepts_gzip(&headers));
    }

    #[test]
    fn encoded_head_drops_length() {
        let mut res = crate::body::head(10);
        encode_head(&mut res);
        assert!(res.headers().get(CONTENT_LENGTH).is_none());
        assert_eq!(res.headers()[CONTENT_ENCODING], "gzip");
    }
}
