//! HTTP front of the bridge
//!
//! - `GET /` serves the nodeset XML
//! - `GET /variable/:id` reads a variable as `{"value": n}`
//! - `PUT /variable/:id` writes `{"value": {"value": n}}`
//! - `/api/...` status, universe snapshots and test patterns

pub mod handlers;
pub mod routes;
pub mod server;

pub use handlers::{ApiResponse, ReadResponse, StatusResponse, WriteRequest};
pub use routes::build_router;
pub use server::{AppState, WebServer, WebServerConfig};
