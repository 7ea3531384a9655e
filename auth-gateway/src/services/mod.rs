pub mod identity;

pub use identity::{AuthTokens, CognitoIdentityProvider, IdentityProvider};
