// Typed endpoints built on the authenticated client

mod account;

pub use account::{
    AccountApi, AuthPayload, OAuthProvider, ProviderRedirects, SignInRequest, SignUpRequest,
};
