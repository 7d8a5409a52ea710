pub mod batches;
pub mod handlers;
pub mod middleware;
pub mod results;
pub mod routes;

pub use routes::create_router;

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
