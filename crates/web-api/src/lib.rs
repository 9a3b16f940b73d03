//! HTTP API exposing the latest screener snapshot and a manual
//! refresh trigger.

pub mod handlers;
pub mod server;

pub use server::ApiServer;
