//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `reconcile` - Load two sources, reconcile, print or write the report
//! - `terms` - Aggregated extraction columns from a rules file
//! - `provider` - Remote provider health check

pub mod provider;
pub mod reconcile;
pub mod terms;

// Re-export command functions for main.rs
pub use provider::*;
pub use reconcile::*;
pub use terms::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
