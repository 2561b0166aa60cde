//! Tool-protocol boundary
//!
//! stdio transport: newline-delimited JSON-RPC 2.0 messages on stdin,
//! responses on stdout. Diagnostics never go to stdout.

pub mod messages;
pub mod server;

pub use messages::*;
pub use server::McpServer;
