//! Task Endpoints

use super::ApiClient;
use crate::error::TransportError;
use crate::models::{Task, TaskDraft, TaskPatch};

pub const COLLECTION_PATH: &str = "/task/";

pub fn item_path(id: u32) -> String {
    format!("/task/{}", id)
}

pub async fn list(client: &ApiClient) -> Result<Vec<Task>, TransportError> {
    client.get(COLLECTION_PATH).await
}

pub async fn get(client: &ApiClient, id: u32) -> Result<Task, TransportError> {
    client.get(&item_path(id)).await
}

pub async fn create(client: &ApiClient, draft: &TaskDraft) -> Result<Task, TransportError> {
    client.post(COLLECTION_PATH, draft).await
}

pub async fn update(client: &ApiClient, id: u32, patch: &TaskPatch) -> Result<Task, TransportError> {
    client.put(&item_path(id), patch).await
}

pub async fn delete(client: &ApiClient, id: u32) -> Result<(), TransportError> {
    client.delete(&item_path(id)).await
}
