//! HTTP transport and admin endpoints

pub mod routes;
pub mod server;

pub use server::{build_router, HttpServer};
