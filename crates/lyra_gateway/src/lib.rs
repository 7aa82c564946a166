pub mod error;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use server::{router, AppState, GatewayServer};
pub use types::{PromptRequest, ResetResponse, StatusResponse};
