//! Pieces pertaining to the HTTP/2 wire protocol.

pub(crate) mod h2;
