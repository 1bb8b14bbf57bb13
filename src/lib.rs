#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

//! # pushbench
//!
//! pushbench is a synthetic HTTP/2 workload generator. It serves responses
//! of a requested size and simulated generation time, delivered in one of
//! several modes, so that page load strategies can be compared:
//!
//! - **compound**: every resource concatenated into a single response.
//! - **push**: the primary resource in the response, every sub-resource
//!   sent with HTTP/2 Server Push.
//! - **casper**: like push, but a per-connection LRU advisor skips
//!   sub-resources the client was recently pushed.
//!
//! Requests are made to `/api` with the parameters described in
//! [`request`]. Other paths are served from a static directory.
//!
//! The [`server`] module runs the HTTPS listener; the [`orchestrator`] can
//! also be driven directly on any [`orchestrator::Exchange`].

pub use crate::error::{Error, Result};
pub use crate::orchestrator::{handle, Exchange, Report};
pub use crate::push::{PushAdvisor, PushCandidate, Session};
pub use crate::request::{DeliveryMode, ResourceRequest};
pub use crate::server::{Server, Service};

pub mod body;
pub mod config;
mod error;
#[cfg(test)]
mod mock;
pub mod orchestrator;
mod proto;
pub mod push;
pub mod request;
pub mod server;
pub mod trace;
