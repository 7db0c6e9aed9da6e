//! REST and SSE surface for the scan daemon

pub mod handlers;
pub mod server;
pub mod sse;
