//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Database setup (init) and shared utilities (open_db)
//! - `extraction` - AI extraction runs and snapshots
//! - `fields` - Resolved field views, sections and provenance
//! - `serve` - Web server command
//! - `sessions` - Session management and the edit history

pub mod core;
pub mod extraction;
pub mod fields;
pub mod serve;
pub mod sessions;

// Re-export command functions for main.rs
pub use core::*;
pub use extraction::*;
pub use fields::*;
pub use serve::*;
pub use sessions::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Render a JSON value on one line, without quotes around plain strings
pub fn compact(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
