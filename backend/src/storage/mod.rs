//! Record store: storage traits plus the JSON-file implementation and the
//! legacy backup fallback.

pub mod json;
pub mod legacy;
pub mod traits;

pub use json::JsonConnection;
