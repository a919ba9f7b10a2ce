//! HTTP status codes as a typed enum.
//!
//! A short list: the codes waypost emits plus the few services commonly need.
//! Use [`Status`] anywhere a status code is accepted: `Response::status()`, `Response::builder().status()`,
//! or as a bare handler return value.
//!
//! ```rust
//! use waypost::{Response, Status};
//!
//! Response::status(Status::NoContent);
//!
//! Response::builder()
//!     .status(Status::Created)
//!     .header("location", "/thing/abc")
//!     .json(br#"{"id":"abc"}"#.to_vec());
//! ```

#[allow(clippy::enum_variant_names)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok,                  // 200
    Created,             // 201
    NoContent,           // 204

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    BadRequest,          // 400
    NotFound,            // 404
    MethodNotAllowed,    // 405
    Conflict,            // 409

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    InternalServerError, // 500
    NotImplemented,      // 501
    ServiceUnavailable,  // 503
}

impl Status {
    pub fn code(self) -> u16 {
        u16::from(self)
    }
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        match s {
            Status::Ok                  => 200,
            Status::Created             => 201,
            Status::NoContent           => 204,
            Status::BadRequest          => 400,
            Status::NotFound            => 404,
            Status::MethodNotAllowed    => 405,
            Status::Conflict            => 409,
            Status::InternalServerError => 500,
            Status::NotImplemented      => 501,
            Status::ServiceUnavailable  => 503,
        }
    }
}
