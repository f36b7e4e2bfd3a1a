//! API request handlers.

/// Research task handlers (start, fetch, status).
pub mod research;
/// WebSocket progress subscription handler.
pub mod ws;
