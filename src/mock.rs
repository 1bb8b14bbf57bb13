use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use bytes::Bytes;
use http::Response;

use crate::body::BodySink;
use crate::orchestrator::Exchange;
use crate::push::PushCandidate;

/// Records every chunk; fails readiness once `fail_after` chunks were taken.
#[derive(Debug, Default)]
pub(crate) struct VecSink {
    pub(crate) chunks: Vec<(Bytes, bool)>,
    pub(crate) fail_after: Option<usize>,
}

impl VecSink {
    pub(crate) fn lens(&self) -> Vec<usize> {
        self.chunks.iter().map(|(c, _)| c.len()).collect()
    }

    pub(crate) fn total(&self) -> usize {
        self.chunks.iter().map(|(c, _)| c.len()).sum()
    }
}

impl BodySink for VecSink {
    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<crate::Result<()>> {
        match self.fail_after {
            Some(n) if self.chunks.len() >= n => {
                Poll::Ready(Err(crate::Error::new_body_write("peer went away")))
            }
            _ => Poll::Ready(Ok(())),
        }
    }

    fn send_chunk(&mut self, chunk: Bytes, end_of_stream: bool) -> crate::Result<()> {
        self.chunks.push((chunk, end_of_stream));
        Ok(())
    }
}

/// A `VecSink` that stays inspectable after being handed out.
#[derive(Clone, Debug, Default)]
pub(crate) struct SharedSink(Arc<Mutex<VecSink>>);

impl BodySink for SharedSink {
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<crate::Result<()>> {
        self.0.lock().unwrap().poll_ready(cx)
    }

    fn send_chunk(&mut self, chunk: Bytes, end_of_stream: bool) -> crate::Result<()> {
        self.0.lock().unwrap().send_chunk(chunk, end_of_stream)
    }
}

/// An `Exchange` that records what the orchestrator asked of it.
#[derive(Debug, Default)]
pub(crate) struct MockExchange {
    pub(crate) pushes: Vec<String>,
    pub(crate) batches: Vec<Vec<String>>,
    pub(crate) heads: Vec<Response<()>>,
    refuse_push: bool,
    body: SharedSink,
}

impl MockExchange {
    pub(crate) fn refusing_push() -> MockExchange {
        MockExchange {
            refuse_push: true,
            ..MockExchange::default()
        }
    }

    pub(crate) fn failing_after(chunks: usize) -> MockExchange {
        let exchange = MockExchange::default();
        exchange.body.0.lock().unwrap().fail_after = Some(chunks);
        exchange
    }

    pub(crate) fn body_len(&self) -> usize {
        self.body.0.lock().unwrap().total()
    }
}

impl Exchange for MockExchange {
    type Body = SharedSink;

    fn push(&mut self, candidate: &PushCandidate) -> crate::Result<()> {
        self.pushes.push(candidate.path().to_owned());
        if self.refuse_push {
            return Err(crate::Error::new_push("peer disabled push"));
        }
        Ok(())
    }

    fn push_batch(&mut self, batch: &[PushCandidate]) -> Vec<crate::Result<()>> {
        self.batches
            .push(batch.iter().map(|c| c.path().to_owned()).collect());
        batch
            .iter()
            .map(|_| {
                if self.refuse_push {
                    Err(crate::Error::new_push("peer disabled push"))
                } else {
                    Ok(())
                }
            })
            .collect()
    }

    fn respond(&mut self, head: Response<()>) -> crate::Result<SharedSink> {
        self.heads.push(head);
        Ok(self.body.clone())
    }
}
