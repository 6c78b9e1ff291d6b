//! Remote diary service boundary.
//!
//! `RemoteClient` is the seam the sync engine depends on; `HttpRemoteClient`
//! implements it against the HTTP service:
//!
//! | Operation        | Request                                   |
//! |------------------|-------------------------------------------|
//! | register_device  | `POST /users`                             |
//! | create_entry     | `POST /diary-entries`                     |
//! | overwrite_entry  | `PUT /diary-entries/{id}?device_id={id}`  |
//! | list_entries     | `GET /diary-entries?device_id={id}`       |

mod client;
mod error;
pub mod wire;

pub use client::{HttpRemoteClient, RemoteClient, DEFAULT_REQUEST_TIMEOUT};
pub use error::RemoteError;
pub use wire::EntryFields;
