//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod audit;
pub mod extraction;
pub mod fields;
pub mod health;
pub mod provenance;
pub mod sections;
pub mod sessions;
pub mod snapshots;

// Re-export all handlers for use in router
pub use audit::*;
pub use extraction::*;
pub use fields::*;
pub use health::*;
pub use provenance::*;
pub use sections::*;
pub use sessions::*;
pub use snapshots::*;
