//! Core logic - framework-agnostic storage and prefix handling.

/// Typed access to the `guilds` record
pub mod guild;
/// Prefix resolution for incoming messages
pub mod prefix;
/// Generic single-table record store
pub mod record;
