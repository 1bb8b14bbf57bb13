//! Synthetic response bodies
//!
//! Every benchmark response carries a filler body of a requested size. The
//! body is produced in fixed 1 KiB pieces, and each piece is handed to the
//! transport as soon as it is produced, so that clients observe streaming
//! delivery rather than one large frame.
//!
//! There are two pieces to this:
//!
//! - **The [`BodySink`] trait** is what the emitter writes into. The h2
//!   glue implements it on top of a `SendStream`; tests implement it on a
//!   plain vector.
//! - **[`Emitter`]** walks the [`Chunks`] of a payload and writes them,
//!   waiting for the sink to be ready before each one.

use std::task::{Context, Poll};

pub use bytes::Bytes;

pub use self::emit::{head, Chunks, Emitter, CHUNK_SIZE};
pub use self::gzip::{accepts_gzip, encode_head, GzipSink};

mod emit;
mod gzip;

/// A transport that accepts body chunks one by one.
pub trait BodySink {
    /// Waits until the transport can take another chunk.
    ///
    /// Returns an error if the peer has gone away.
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<crate::Result<()>>;

    /// Writes one chunk and flushes it to the transport.
    ///
    /// `end_of_stream` is set on the final chunk of a body.
    fn send_chunk(&mut self, chunk: Bytes, end_of_stream: bool) -> crate::Result<()>;
}

impl<S: BodySink + ?Sized> BodySink for Box<S> {
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<crate::Result<()>> {
        (**self).poll_ready(cx)
    }

    fn send_chunk(&mut self, chunk: Bytes, end_of_stream: bool) -> crate::Result<()> {
        (**self).send_chunk(chunk, end_of_stream)
    }
}

fn _assert_send_sync() {
    fn _assert_send<T: Send>() {}
    fn _assert_sync<T: Sync>() {}

    _assert_send::<Chunks>();
    _assert_sync::<Chunks>();
}
