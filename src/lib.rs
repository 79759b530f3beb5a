pub mod backend;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod navigation;
pub mod response;
pub mod routes;
pub mod services;
pub mod utils;
pub mod validation;
pub mod websocket;

pub use backend::{Backend, SharedBackend};
pub use error::{AppError, AppResult};
pub use middleware::auth::AuthUser;
pub use response::ApiResponse;
