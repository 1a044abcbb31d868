//! calcd library - exposes the router for testing.

pub mod routes;
pub mod server;

pub use server::{build_router, AppState};
