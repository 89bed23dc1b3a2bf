//! Discord command implementations organized by extension.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Latency and bot information commands
pub mod meta;

/// Owner-only bot management commands
pub mod owner;

/// Per-guild configuration commands
pub mod settings;

// Export commands
pub use meta::{credits, ping};
pub use owner::{reload, shutdown};
pub use settings::prefix;
