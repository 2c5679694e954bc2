//! use certorder::error::CertOrderError;

use std::fmt;

use thiserror::Error;

use crate::api::ApiErrors;

pub type Result<T> = std::result::Result<T, CertOrderError>;

/// Represents errors that can occur while building a request or placing an order.
///
/// Every failure is terminal for the current invocation. Callers add context with
/// [`ResultExt::context`]; [`CertOrderError::kind`] always reports the original kind.
#[derive(Debug, Error)]
pub enum CertOrderError {
    /// The key algorithm selector is not one of `""`, `"P256"` or `"P384"`.
    #[error("unsupported key algorithm {0:?}, valid values are \"\" (RSA), \"P256\" and \"P384\"")]
    UnsupportedAlgorithm(String),

    /// Key generation failed, usually because the random source is unusable.
    #[error("failed to generate private key: {0}")]
    KeyGenerationFailed(String),

    /// The certificate request could not be built, signed or encoded.
    #[error("failed to generate CSR: {0}")]
    CsrConstructionFailed(String),

    /// The encoded certificate request could not be parsed back.
    #[error("failed to parse CSR: {0}")]
    CsrParseFailed(String),

    /// A private key of an unrecognized type was encountered.
    #[error("unknown private key type {0}")]
    UnknownKeyType(String),

    /// The private key could not be marshaled to its binary encoding.
    #[error("unable to marshal private key: {0}")]
    KeyEncodingFailed(String),

    /// No response could be obtained from the CA.
    #[error("received empty response from CA api: {0}")]
    NetworkError(String),

    /// The transport failed after the CA produced a response.
    #[error("failed to request the CA api: {status}: {message}")]
    TransportFailure { status: String, message: String },

    /// The CA answered with a status of 300 or above.
    #[error("CA api rejected the request with {status}: {detail}")]
    ApiRequestRejected {
        status: String,
        detail: RejectionDetail,
    },

    /// The order endpoint answered with something other than `201 Created`.
    #[error("failed to create order: {0}")]
    OrderRejected(String),

    /// The order response did not contain exactly one request.
    #[error("expected exactly one request in the order response, found {0}")]
    AmbiguousOrderResponse(usize),

    /// A caller supplied value violates a precondition.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A successful response body could not be decoded.
    #[error("failed to parse JSON response body: {0}")]
    MalformedResponse(String),

    /// The HTTP channel could not be configured.
    #[error("failed to configure CA client: {0}")]
    ClientConfiguration(String),

    /// Another error wrapped with the operation that produced it.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<CertOrderError>,
    },
}

/// The error body returned alongside a rejected request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionDetail {
    /// The body decoded into the CA's error list.
    Structured(ApiErrors),
    /// The body could not be decoded; it is kept verbatim.
    Raw { body: String, decode_error: String },
}

impl fmt::Display for RejectionDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionDetail::Structured(errors) => write!(f, "{errors}"),
            RejectionDetail::Raw { body, decode_error } => {
                write!(f, "{body} (undecodable error body: {decode_error})")
            }
        }
    }
}

/// The kind of a [`CertOrderError`], independent of any context wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedAlgorithm,
    KeyGenerationFailed,
    CsrConstructionFailed,
    CsrParseFailed,
    UnknownKeyType,
    KeyEncodingFailed,
    NetworkError,
    TransportFailure,
    ApiRequestRejected,
    OrderRejected,
    AmbiguousOrderResponse,
    InvalidInput,
    MalformedResponse,
    ClientConfiguration,
}

impl CertOrderError {
    /// Wraps the error with the operation that produced it.
    pub fn context(self, context: impl Into<String>) -> Self {
        CertOrderError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping every context layer.
    pub fn root(&self) -> &CertOrderError {
        match self {
            CertOrderError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns the kind of the innermost error.
    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            CertOrderError::UnsupportedAlgorithm(_) => ErrorKind::UnsupportedAlgorithm,
            CertOrderError::KeyGenerationFailed(_) => ErrorKind::KeyGenerationFailed,
            CertOrderError::CsrConstructionFailed(_) => ErrorKind::CsrConstructionFailed,
            CertOrderError::CsrParseFailed(_) => ErrorKind::CsrParseFailed,
            CertOrderError::UnknownKeyType(_) => ErrorKind::UnknownKeyType,
            CertOrderError::KeyEncodingFailed(_) => ErrorKind::KeyEncodingFailed,
            CertOrderError::NetworkError(_) => ErrorKind::NetworkError,
            CertOrderError::TransportFailure { .. } => ErrorKind::TransportFailure,
            CertOrderError::ApiRequestRejected { .. } => ErrorKind::ApiRequestRejected,
            CertOrderError::OrderRejected(_) => ErrorKind::OrderRejected,
            CertOrderError::AmbiguousOrderResponse(_) => ErrorKind::AmbiguousOrderResponse,
            CertOrderError::InvalidInput(_) => ErrorKind::InvalidInput,
            CertOrderError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            CertOrderError::ClientConfiguration(_) => ErrorKind::ClientConfiguration,
            CertOrderError::Context { .. } => unreachable!("root() never returns a context layer"),
        }
    }

    /// Returns the CA's rejection detail, if this error carries one.
    pub fn rejection(&self) -> Option<&RejectionDetail> {
        match self.root() {
            CertOrderError::ApiRequestRejected { detail, .. } => Some(detail),
            _ => None,
        }
    }
}

/// Adds operation context to fallible results.
pub trait ResultExt<T> {
    /// Wraps the error, if any, with `context`.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|err| err.context(context))
    }
}

impl From<rsa::Error> for CertOrderError {
    fn from(err: rsa::Error) -> Self {
        CertOrderError::KeyGenerationFailed(err.to_string())
    }
}

impl From<rsa::pkcs1::Error> for CertOrderError {
    fn from(err: rsa::pkcs1::Error) -> Self {
        CertOrderError::KeyEncodingFailed(err.to_string())
    }
}
