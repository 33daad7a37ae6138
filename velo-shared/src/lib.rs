pub mod clients;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod schema;
pub mod types;

pub use errors::{AppError, AppResult, ErrorCode};
pub use types::*;
