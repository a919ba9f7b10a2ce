//! Error classification: domain failures to status codes and error payloads.
//!
//! Business logic returns its own error types. Each type declares its
//! [`ErrorClass`] through [`Classify`]; the transport adapter is the only
//! place that turns a class into a status code and a `{"error": ...}` body.
//!
//! | Class | Status | Payload message |
//! |---|---|---|
//! | `NotFound` | 404 | `"not found"` (fixed: route misses and handler misses look identical) |
//! | `Conflict` | 409 | the error's `Display` |
//! | `BadRequest` | 400 | the error's `Display` |
//! | `Internal` | 500 | `"internal server error"` (the detail is logged, not sent) |

use std::error::Error as StdError;
use std::fmt;

use serde::Serialize;

use crate::context::Context;
use crate::response::Response;
use crate::status::Status;

/// Boxed error carried by an [`EndpointError`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

const NOT_FOUND_MESSAGE: &str = "not found";
const INTERNAL_MESSAGE: &str = "internal server error";

/// The finite set of failure kinds the transport knows how to report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    NotFound,
    Conflict,
    BadRequest,
    Internal,
}

impl ErrorClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound   => "not_found",
            Self::Conflict   => "conflict",
            Self::BadRequest => "bad_request",
            Self::Internal   => "internal",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static class → status table.
pub fn status_for(class: ErrorClass) -> Status {
    match class {
        ErrorClass::NotFound   => Status::NotFound,
        ErrorClass::Conflict   => Status::Conflict,
        ErrorClass::BadRequest => Status::BadRequest,
        ErrorClass::Internal   => Status::InternalServerError,
    }
}

/// Declares which [`ErrorClass`] an error belongs to.
///
/// The default is `Internal`, so an error type that opts in without
/// overriding anything is reported as a server fault.
pub trait Classify {
    fn class(&self) -> ErrorClass {
        ErrorClass::Internal
    }
}

/// Returns the class of a pipeline error.
pub fn classify(err: &EndpointError) -> ErrorClass {
    err.class
}

// ── EndpointError ─────────────────────────────────────────────────────────────

/// The error type of every endpoint pipeline.
///
/// Holds the original error and its class. Not itself a `std::error::Error`;
/// any classified error converts into it with `?`:
///
/// ```rust
/// use waypost::{Classify, EndpointError, ErrorClass};
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("no such thing: {0}")]
/// struct Missing(String);
///
/// impl Classify for Missing {
///     fn class(&self) -> ErrorClass { ErrorClass::NotFound }
/// }
///
/// let err: EndpointError = Missing("zzz".into()).into();
/// assert_eq!(err.class(), ErrorClass::NotFound);
/// assert!(err.downcast_ref::<Missing>().is_some());
/// ```
pub struct EndpointError {
    class: ErrorClass,
    inner: BoxError,
}

impl EndpointError {
    pub fn new(class: ErrorClass, err: impl Into<BoxError>) -> Self {
        Self { class, inner: err.into() }
    }

    /// Wraps an error the classifier knows nothing about. Always `Internal`.
    pub fn internal(err: impl Into<BoxError>) -> Self {
        Self::new(ErrorClass::Internal, err)
    }

    /// The error used for route misses.
    pub fn not_found() -> Self {
        Self::new(ErrorClass::NotFound, NOT_FOUND_MESSAGE)
    }

    pub fn class(&self) -> ErrorClass {
        self.class
    }

    pub fn get_ref(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.inner
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    pub fn into_inner(self) -> BoxError {
        self.inner
    }
}

impl<E> From<E> for EndpointError
where
    E: StdError + Classify + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self::new(err.class(), err)
    }
}

impl fmt::Debug for EndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointError")
            .field("class", &self.class)
            .field("inner", &self.inner)
            .finish()
    }
}

impl fmt::Display for EndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

// ── Framework error types ─────────────────────────────────────────────────────

/// Malformed or missing request input. Always `BadRequest`.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("missing path parameter `{0}`")]
    MissingParam(&'static str),

    #[error("invalid path parameter `{name}`: {reason}")]
    InvalidParam { name: &'static str, reason: String },

    #[error("bad request body: {0}")]
    Body(String),
}

impl Classify for DecodeError {
    fn class(&self) -> ErrorClass {
        ErrorClass::BadRequest
    }
}

/// An operation a service declares but does not implement.
#[derive(Debug, thiserror::Error)]
#[error("operation `{operation}` is not implemented")]
pub struct Unimplemented {
    pub operation: &'static str,
}

impl Classify for Unimplemented {}

impl Classify for std::io::Error {}

// ── Rendering ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// Encodes a pipeline error as `{"error": message}` with its class's status.
///
/// Total: every error yields a JSON body and a status from the table.
pub fn render(ctx: Option<&Context>, err: &EndpointError) -> Response {
    let class = err.class();
    let detail = err.to_string();
    let message = match class {
        ErrorClass::NotFound => NOT_FOUND_MESSAGE,
        ErrorClass::Internal => {
            tracing::error!(
                request_id = ctx.map(Context::request_id),
                route = ctx.map(Context::route),
                error = %detail,
                "endpoint failed",
            );
            INTERNAL_MESSAGE
        }
        ErrorClass::Conflict | ErrorClass::BadRequest => detail.as_str(),
    };

    Response::builder()
        .status(status_for(class))
        .json_value(&ErrorBody { error: message })
}
