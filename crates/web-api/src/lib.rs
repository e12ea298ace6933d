//! Web API 层。
//!
//! 提供 Axum 路由，将 HTTP / SSE 请求委托给应用层的私信服务。

mod auth;
mod error;
mod routes;
mod state;
mod stream;

pub use auth::{bearer_token, Claims, CurrentUser, JwtError, JwtService};
pub use config::JwtConfig;
pub use error::{ApiError, ErrorBody};
pub use routes::router;
pub use state::AppState;
