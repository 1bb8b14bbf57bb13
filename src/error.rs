//! Error and Result module.
use std::error::Error as StdError;
use std::fmt;

/// Result type often returned from methods that can have pushbench `Error`s.
pub type Result<T> = std::result::Result<T, Error>;

type Cause = Box<dyn StdError + Send + Sync>;

/// Represents errors that can occur while serving benchmark requests.
pub struct Error {
    inner: Box<ErrorImpl>,
}

struct ErrorImpl {
    kind: Kind,
    cause: Option<Cause>,
}

#[derive(Debug, PartialEq)]
pub(crate) enum Kind {
    /// A required query parameter was missing or not an integer.
    Param(&'static str),
    /// A push promise could not be issued.
    Push,
    /// Error while writing a body chunk to the connection.
    BodyWrite,
    /// A general error from h2.
    Http2,
    /// Error creating a TcpListener.
    Listen,
    /// Error accepting on the listener.
    Accept,
    /// Certificate provisioning or TLS handshake failure.
    Tls,
}

impl Error {
    /// Returns true if this was a request validation error.
    pub fn is_param(&self) -> bool {
        matches!(self.inner.kind, Kind::Param(_))
    }

    /// Returns the name of the offending parameter, if this is a validation error.
    pub fn param(&self) -> Option<&'static str> {
        match self.inner.kind {
            Kind::Param(name) => Some(name),
            _ => None,
        }
    }

    /// Returns true if a push promise was refused.
    pub fn is_push(&self) -> bool {
        self.inner.kind == Kind::Push
    }

    /// Returns true if writing a body chunk failed.
    pub fn is_body_write(&self) -> bool {
        self.inner.kind == Kind::BodyWrite
    }

    /// Returns true if this error came from TLS setup or a TLS handshake.
    pub fn is_tls(&self) -> bool {
        self.inner.kind == Kind::Tls
    }

    /// Consumes the error, returning its cause.
    pub fn into_cause(self) -> Option<Box<dyn StdError + Send + Sync>> {
        self.inner.cause
    }

    pub(crate) fn new(kind: Kind) -> Error {
        Error {
            inner: Box::new(ErrorImpl { kind, cause: None }),
        }
    }

    pub(crate) fn with<C: Into<Cause>>(mut self, cause: C) -> Error {
        self.inner.cause = Some(cause.into());
        self
    }

    pub(crate) fn new_param(name: &'static str) -> Error {
        Error::new(Kind::Param(name))
    }

    pub(crate) fn new_push<E: Into<Cause>>(cause: E) -> Error {
        Error::new(Kind::Push).with(cause)
    }

    pub(crate) fn new_body_write<E: Into<Cause>>(cause: E) -> Error {
        Error::new(Kind::BodyWrite).with(cause)
    }

    pub(crate) fn new_h2(cause: h2::Error) -> Error {
        Error::new(Kind::Http2).with(cause)
    }

    pub(crate) fn new_listen<E: Into<Cause>>(cause: E) -> Error {
        Error::new(Kind::Listen).with(cause)
    }

    pub(crate) fn new_accept<E: Into<Cause>>(cause: E) -> Error {
        Error::new(Kind::Accept).with(cause)
    }

    pub(crate) fn new_tls<E: Into<Cause>>(cause: E) -> Error {
        Error::new(Kind::Tls).with(cause)
    }

    fn description(&self) -> &str {
        match self.inner.kind {
            Kind::Param(_) => "invalid request parameter",
            Kind::Push => "error pushing a resource",
            Kind::BodyWrite => "error writing a body to connection",
            Kind::Http2 => "http2 error",
            Kind::Listen => "error creating server listener",
            Kind::Accept => "error accepting connection",
            Kind::Tls => "tls error",
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_tuple("pushbench::Error");
        f.field(&self.inner.kind);
        if let Some(ref cause) = self.inner.cause {
            f.field(cause);
        }
        f.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Kind::Param(name) = self.inner.kind {
            return write!(
                f,
                "the \"{}\" parameter must be provided and must be an integer",
                name
            );
        }
        if let Some(ref cause) = self.inner.cause {
            write!(f, "{}: {}", self.description(), cause)
        } else {
            f.write_str(self.description())
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .cause
            .as_ref()
            .map(|cause| &**cause as &(dyn StdError + 'static))
    }
}

#[doc(hidden)]
trait AssertSendSync: Send + Sync + 'static {}
#[doc(hidden)]
impl AssertSendSync for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn error_size_of() {
        assert_eq!(mem::size_of::<Error>(), mem::size_of::<usize>());
    }

    #[test]
    fn param_message_names_the_parameter() {
        let err = Error::new_param("nb");
        assert!(err.is_param());
        assert_eq!(err.param(), Some("nb"));
        assert_eq!(
            err.to_string(),
            "the \"nb\" parameter must be provided and must be an integer"
        );
    }

    #[test]
    fn display_includes_cause() {
        let err = Error::new_push(h2::Error::from(h2::Reason::REFUSED_STREAM));
        assert!(err.is_push());
        assert!(!err.is_body_write());
        assert!(err.to_string().starts_with("error pushing a resource: "));
        assert!(err.source().is_some());
    }

    #[test]
    fn with_replaces_cause() {
        let err = Error::new(Kind::Tls).with("no private key found");
        assert!(err.is_tls());
        assert_eq!(err.to_string(), "tls error: no private key found");
        assert!(err.into_cause().is_some());
    }
}
