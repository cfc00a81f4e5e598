//! Reminder Endpoints

use super::ApiClient;
use crate::error::TransportError;
use crate::models::{Reminder, ReminderDraft};

pub const COLLECTION_PATH: &str = "/reminder/";

pub async fn list(client: &ApiClient) -> Result<Vec<Reminder>, TransportError> {
    client.get(COLLECTION_PATH).await
}

pub async fn create(client: &ApiClient, draft: &ReminderDraft) -> Result<Reminder, TransportError> {
    client.post(COLLECTION_PATH, draft).await
}
