//! Auth Endpoints
//!
//! Anonymous credential exchanges: registration, email verification, login.

use super::ApiClient;
use crate::error::TransportError;
use crate::models::{Credentials, EmailVerification, Registration, TokenResponse};

pub async fn register(client: &ApiClient, registration: &Registration) -> Result<serde_json::Value, TransportError> {
    client.post("/auth/register", registration).await
}

pub async fn verify_email(client: &ApiClient, verification: &EmailVerification) -> Result<serde_json::Value, TransportError> {
    client.post("/auth/verify-email", verification).await
}

pub async fn login(client: &ApiClient, credentials: &Credentials) -> Result<TokenResponse, TransportError> {
    client.post("/auth/login", credentials).await
}
