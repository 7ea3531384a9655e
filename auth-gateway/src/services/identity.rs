//! Identity provider seam and the Cognito implementation.
//!
//! Handlers talk to `IdentityProvider` only; the Cognito client, secret
//! hash plumbing, and SDK error mapping stay in this module.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::error::ProvideErrorMetadata;
use aws_sdk_cognitoidentityprovider::types::{AttributeType, AuthFlowType};
use tracing::debug;

use crate::error::{AppError, Result};
use crate::security::secret_hash;

/// Token pair handed back by the provider on login
#[derive(Debug, Clone)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a user. Returns the provider-assigned subject identifier.
    async fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<String>;

    /// Confirm a pending registration with the emailed one-time code.
    async fn confirm_sign_up(&self, email: &str, code: &str) -> Result<()>;

    /// Re-send the confirmation code.
    async fn resend_confirmation_code(&self, email: &str) -> Result<()>;

    /// Password login. Returns the provider's token pair verbatim.
    async fn login(&self, email: &str, password: &str) -> Result<AuthTokens>;

    /// Exchange a refresh token for a fresh access token.
    async fn refresh(&self, cognito_sub: &str, refresh_token: &str) -> Result<String>;

    /// Resolve the user attributes behind an access token.
    async fn get_user(&self, access_token: &str) -> Result<HashMap<String, String>>;
}

/// AWS Cognito implementation
#[derive(Clone)]
pub struct CognitoIdentityProvider {
    client: aws_sdk_cognitoidentityprovider::Client,
    client_id: String,
    client_secret: String,
}

impl CognitoIdentityProvider {
    pub fn new(
        client: aws_sdk_cognitoidentityprovider::Client,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            client,
            client_id,
            client_secret,
        }
    }

    fn secret_hash_for(&self, username: &str) -> String {
        secret_hash(username, &self.client_id, &self.client_secret)
    }

    fn attribute(name: &str, value: &str) -> Result<AttributeType> {
        AttributeType::builder()
            .name(name)
            .value(value)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid user attribute: {e}")))
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentityProvider {
    async fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<String> {
        let response = self
            .client
            .sign_up()
            .client_id(&self.client_id)
            .username(email)
            .password(password)
            .secret_hash(self.secret_hash_for(email))
            .user_attributes(Self::attribute("email", email)?)
            .user_attributes(Self::attribute("name", name)?)
            .send()
            .await
            .map_err(|e| provider_error(e.into_service_error()))?;

        let user_sub = response.user_sub().to_string();
        if user_sub.is_empty() {
            return Err(AppError::Provider(
                "Identity provider did not return a user sub".to_string(),
            ));
        }

        debug!(user_sub = %user_sub, "sign-up initiated");
        Ok(user_sub)
    }

    async fn confirm_sign_up(&self, email: &str, code: &str) -> Result<()> {
        self.client
            .confirm_sign_up()
            .client_id(&self.client_id)
            .username(email)
            .confirmation_code(code)
            .secret_hash(self.secret_hash_for(email))
            .send()
            .await
            .map_err(|e| provider_error(e.into_service_error()))?;

        Ok(())
    }

    async fn resend_confirmation_code(&self, email: &str) -> Result<()> {
        self.client
            .resend_confirmation_code()
            .client_id(&self.client_id)
            .username(email)
            .secret_hash(self.secret_hash_for(email))
            .send()
            .await
            .map_err(|e| provider_error(e.into_service_error()))?;

        Ok(())
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthTokens> {
        let response = self
            .client
            .initiate_auth()
            .client_id(&self.client_id)
            .auth_flow(AuthFlowType::UserPasswordAuth)
            .auth_parameters("USERNAME", email)
            .auth_parameters("PASSWORD", password)
            .auth_parameters("SECRET_HASH", self.secret_hash_for(email))
            .send()
            .await
            .map_err(|e| provider_error(e.into_service_error()))?;

        let authentication = response.authentication_result().ok_or_else(|| {
            AppError::Provider("Authentication result missing from provider response".to_string())
        })?;

        match (authentication.access_token(), authentication.refresh_token()) {
            (Some(access_token), Some(refresh_token)) => Ok(AuthTokens {
                access_token: access_token.to_string(),
                refresh_token: refresh_token.to_string(),
            }),
            _ => Err(AppError::Provider(
                "Provider response missing tokens".to_string(),
            )),
        }
    }

    async fn refresh(&self, cognito_sub: &str, refresh_token: &str) -> Result<String> {
        let response = self
            .client
            .initiate_auth()
            .client_id(&self.client_id)
            .auth_flow(AuthFlowType::RefreshTokenAuth)
            .auth_parameters("REFRESH_TOKEN", refresh_token)
            .auth_parameters("SECRET_HASH", self.secret_hash_for(cognito_sub))
            .send()
            .await
            .map_err(|e| provider_error(e.into_service_error()))?;

        response
            .authentication_result()
            .and_then(|auth| auth.access_token())
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::Provider("Provider response missing access token".to_string())
            })
    }

    async fn get_user(&self, access_token: &str) -> Result<HashMap<String, String>> {
        let response = self
            .client
            .get_user()
            .access_token(access_token)
            .send()
            .await
            .map_err(|_| AppError::Unauthorized)?;

        Ok(response
            .user_attributes()
            .iter()
            .filter_map(|attr| {
                attr.value()
                    .map(|value| (attr.name().to_string(), value.to_string()))
            })
            .collect())
    }
}

/// Surface the provider's own message the way the original API did,
/// falling back to the SDK rendering when there is none.
fn provider_error<E>(err: E) -> AppError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string());
    AppError::Provider(message)
}
