// Authentication module
// Authenticated request client and the token refresh protocol

mod client;
mod refresh;
mod types;

pub use client::{AuthClient, DEFAULT_ACCESS_TOKEN_MAX_AGE};
pub use refresh::{refresh_url, REFRESH_PATH};
pub use types::RefreshPolicy;
