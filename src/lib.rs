// Kkom-Kkom client - Library root

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod http_client;
pub mod session;
pub mod transport;

pub use auth::{AuthClient, RefreshPolicy};
pub use error::{ClientError, Result};
pub use session::{MemorySessionStore, SessionStore, SqliteSessionStore};
pub use transport::{ApiRequest, ApiResponse, HttpTransport};
