//! Types shared between the hireboard server and its clients: the closed
//! enumerations of the data model and the JSON payloads of the HTTP API.

pub mod api;
pub mod enums;

pub use api::*;
pub use enums::*;
