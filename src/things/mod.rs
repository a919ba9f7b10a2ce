//! The thing-lookup service: a small reference application on waypost.
//!
//! | Route | Operation |
//! |---|---|
//! | `GET /thing/{id:alpha}` | [`Things::get_thing`] |
//! | `GET /things` | [`Things::all_things`] |
//! | `POST /thing` | [`Things::add_thing`] |
//! | `DELETE /thing/{id:alpha}` | [`Things::remove_thing`] |
//!
//! The layers, inside out: [`ThingStore`] holds the data, [`StoreThings`]
//! implements the [`Things`] capability set over it, [`LoggingThings`] and
//! [`ObservedThings`] decorate that, and [`ThingService`] exposes the result
//! over HTTP.

mod endpoints;
mod middleware;
mod service;
mod store;

pub use self::endpoints::ThingService;
pub use self::middleware::{LoggingThings, ObservedThings, REQUEST_DURATION, REQUESTS_TOTAL};
pub use self::service::{StoreThings, ThingError, Things};
pub use self::store::{Thing, ThingStore};
