//! HTTP API: routing, bearer authentication, permission gates and the
//! response envelope.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod middleware;
