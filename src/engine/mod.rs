//! Domain engines: everything that validates and applies state against the
//! store document. The API layer translates HTTP to these calls and maps
//! the typed errors back to responses.

pub mod applications;
pub mod orders;
pub mod reviews;
pub mod visibility;
