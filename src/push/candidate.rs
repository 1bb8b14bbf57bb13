use std::fmt;

use crate::request::{ResourceRequest, API_PATH};

/// A sub-resource that may be pushed alongside a primary response.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PushCandidate {
    index: u32,
    hit: bool,
    path: String,
}

impl PushCandidate {
    /// Builds the candidate with 1-based `index` for `req`.
    ///
    /// The candidate's own request asks for a single resource of the same
    /// size and delay; it is a cache hit when `index < hits`.
    pub fn new(req: &ResourceRequest, index: u32) -> PushCandidate {
        let hit = index < req.hits();
        let path = format!(
            "{}?type={}&nb=1&bytes={}&delay={}&hits={}&id={}",
            API_PATH,
            req.mode(),
            req.bytes(),
            req.delay_ms(),
            u8::from(hit),
            index,
        );
        PushCandidate { index, hit, path }
    }

    /// The 1-based index of this sub-resource.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Whether this sub-resource is already warm.
    pub fn is_hit(&self) -> bool {
        self.hit
    }

    /// Path and query identifying this sub-resource.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The query part of `path()`.
    pub fn query(&self) -> &str {
        self.path
            .split_once('?')
            .map_or("", |(_, query)| query)
    }
}

impl AsRef<str> for PushCandidate {
    fn as_ref(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for PushCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// The candidates with indices `1..N` of a pushing request, in order.
///
/// Modes that do not push have no candidates.
pub fn candidates(req: &ResourceRequest) -> Vec<PushCandidate> {
    if !req.mode().pushes() {
        return Vec::new();
    }
    (1..req.count())
        .map(|index| PushCandidate::new(req, index))
        .collect()
}
