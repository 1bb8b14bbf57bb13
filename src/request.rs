//! Benchmark request parameters.
//!
//! A `ResourceRequest` is parsed from the query string of a request to the
//! benchmark endpoint:
//!
//! | Parameter | Meaning |
//! |-----------|---------|
//! | `type`    | `compound`, `push`, `casper`, anything else is plain |
//! | `nb`      | the number of resources to deliver |
//! | `bytes`   | the size of each resource |
//! | `delay`   | milliseconds needed to generate a single resource |
//! | `hits`    | the number of resources already cached (no generation delay) |
//! | `id`      | disambiguates pushed sub-resources, never validated |

use std::fmt;
use std::time::Duration;

use url::form_urlencoded;

/// Path of the benchmark endpoint.
pub const API_PATH: &str = "/api";

/// How the resources of one request are delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryMode {
    /// All resources concatenated into one response (`type=compound`).
    Sequential,
    /// Every sub-resource pushed unconditionally (`type=push`).
    RawPush,
    /// Sub-resources filtered through the connection's push advisor (`type=casper`).
    CacheAwarePush,
    /// No push phase; any other `type`.
    Plain,
}

impl DeliveryMode {
    /// Maps the `type` parameter to a mode. Unknown values are `Plain`.
    pub fn from_param(value: &str) -> DeliveryMode {
        match value {
            "compound" => DeliveryMode::Sequential,
            "push" => DeliveryMode::RawPush,
            "casper" => DeliveryMode::CacheAwarePush,
            _ => DeliveryMode::Plain,
        }
    }

    /// The `type` parameter value naming this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::Sequential => "compound",
            DeliveryMode::RawPush => "push",
            DeliveryMode::CacheAwarePush => "casper",
            DeliveryMode::Plain => "plain",
        }
    }

    /// Whether this mode pushes sub-resources before the primary payload.
    pub fn pushes(&self) -> bool {
        matches!(self, DeliveryMode::RawPush | DeliveryMode::CacheAwarePush)
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One simulated request, immutable once parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceRequest {
    mode: DeliveryMode,
    count: u32,
    bytes: u64,
    delay: u64,
    hits: u32,
    id: Option<String>,
}

impl ResourceRequest {
    /// Creates a request without going through a query string.
    pub fn new(mode: DeliveryMode, count: u32, bytes: u64, delay_ms: u64, hits: u32) -> Self {
        ResourceRequest {
            mode,
            count,
            bytes,
            delay: delay_ms,
            hits,
            id: None,
        }
    }

    /// Parses and validates a raw query string.
    ///
    /// `nb`, `bytes`, `delay` and `hits` are required non-negative integers;
    /// the first one that is missing or malformed is reported.
    pub fn from_query(query: &str) -> crate::Result<ResourceRequest> {
        let mut mode = None;
        let mut count = None;
        let mut bytes = None;
        let mut delay = None;
        let mut hits = None;
        let mut id = None;

        // Only the first occurrence of a key counts.
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match &*key {
                "type" if mode.is_none() => mode = Some(DeliveryMode::from_param(&value)),
                "nb" if count.is_none() => count = Some(value),
                "bytes" if bytes.is_none() => bytes = Some(value),
                "delay" if delay.is_none() => delay = Some(value),
                "hits" if hits.is_none() => hits = Some(value),
                "id" if id.is_none() => id = Some(value.into_owned()),
                _ => (),
            }
        }

        let req = ResourceRequest {
            mode: mode.unwrap_or(DeliveryMode::Plain),
            count: int_param("nb", count.as_deref())?,
            bytes: int_param("bytes", bytes.as_deref())?,
            delay: int_param("delay", delay.as_deref())?,
            hits: int_param("hits", hits.as_deref())?,
            id,
        };
        tracing::trace!(?req, "parsed benchmark request");
        Ok(req)
    }

    /// The requested delivery mode.
    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Total resource count `N`.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Payload size of each resource.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Simulated generation delay of one resource.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay)
    }

    /// Generation delay in milliseconds, as found in the query.
    pub fn delay_ms(&self) -> u64 {
        self.delay
    }

    /// Number of resources considered already cached.
    pub fn hits(&self) -> u32 {
        self.hits
    }

    /// The sub-resource index, if any.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

fn int_param<T: std::str::FromStr>(name: &'static str, value: Option<&str>) -> crate::Result<T> {
    value
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| crate::Error::new_param(name))
}
