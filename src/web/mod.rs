//! HTTP/WebSocket transport

pub mod server;
pub mod ws;

pub use server::create_router;
