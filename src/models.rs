//! Frontend Models
//!
//! Data structures matching the task service, plus the drafts the forms
//! submit. Drafts validate themselves before they are sent.

use std::fmt;
use std::hash::Hash;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::validation::{check_email, check_min, check_optional_min, check_required, char_len, Validate, ValidationErrors};

/// Server-owned record with a server-assigned identity
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Copy + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + 'static;

    fn id(&self) -> Self::Id;
}

// ========================
// Tasks
// ========================

/// Task data structure (matches backend)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Entity for Task {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }
}

/// New task as submitted by the create form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDraft {
    pub name: String,
    pub description: Option<String>,
}

impl TaskDraft {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self { name: name.into(), description }
    }

    /// Trimmed copy; a blank description becomes `null`
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            description: normalize_optional(self.description.as_deref()),
        }
    }
}

impl Validate for TaskDraft {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_min(&mut errors, "name", "Name", &self.name, 3);
        check_optional_min(&mut errors, "description", "Description", self.description.as_deref(), 3);
        errors.into_result()
    }
}

/// Partial task update. `description: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

impl TaskPatch {
    /// Full edit as produced by the task card: both fields are sent
    pub fn edit(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: Some(name.into()),
            description: Some(description),
        }
    }

    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.as_deref().map(|n| n.trim().to_string()),
            description: self.description.as_ref().map(|d| normalize_optional(d.as_deref())),
        }
    }
}

impl Validate for TaskPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            check_min(&mut errors, "name", "Name", name, 3);
        }
        if let Some(description) = &self.description {
            check_optional_min(&mut errors, "description", "Description", description.as_deref(), 3);
        }
        errors.into_result()
    }
}

// ========================
// Reminders
// ========================

/// Reminder data structure (matches backend)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: u32,
    pub message: String,
    pub description: String,
    pub author: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Entity for Reminder {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }
}

impl Reminder {
    /// Card label, e.g. "Jan 5, 2024, 03:04 PM"
    pub fn created_label(&self) -> String {
        self.created_at.format("%b %-d, %Y, %I:%M %p").to_string()
    }
}

/// Server timestamps come either with an offset or naive (taken as UTC).
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

/// New reminder as submitted by the form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderDraft {
    pub message: String,
    pub description: String,
    pub author: String,
}

impl ReminderDraft {
    pub fn normalized(&self) -> Self {
        Self {
            message: self.message.trim().to_string(),
            description: self.description.trim().to_string(),
            author: self.author.trim().to_string(),
        }
    }
}

impl Validate for ReminderDraft {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_required(&mut errors, "message", "Message", &self.message);
        check_required(&mut errors, "description", "Description", &self.description);
        check_required(&mut errors, "author", "Author", &self.author);
        errors.into_result()
    }
}

// ========================
// Auth Payloads
// ========================

/// Login form
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Validate for Credentials {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_required(&mut errors, "username", "Username", &self.username);
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        }
        errors.into_result()
    }
}

/// Registration form. `confirm_password` stays on the client.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub name: String,
    pub password: String,
    #[serde(skip)]
    pub confirm_password: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Validate for Registration {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.username.is_empty() {
            errors.add("username", "Username is required");
        } else if char_len(&self.username) < 3 {
            errors.add("username", "Username must be at least 3 characters");
        } else if char_len(&self.username) > 50 {
            errors.add("username", "Username must be less than 50 characters");
        }

        check_email(&mut errors, "email", &self.email);

        if self.name.is_empty() {
            errors.add("name", "Name is required");
        } else if char_len(&self.name) < 3 {
            errors.add("name", "Name must be at least 3 characters");
        }

        if self.password.is_empty() {
            errors.add("password", "Password is required");
        } else if char_len(&self.password) < 3 {
            errors.add("password", "Password must be at least 3 characters");
        }

        if self.password != self.confirm_password {
            errors.add("confirm_password", "Passwords do not match");
        }

        errors.into_result()
    }
}

/// Email verification code entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailVerification {
    pub email: String,
    pub code: String,
}

impl Validate for EmailVerification {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.email.trim().is_empty() {
            errors.add("email", "Please register first to verify your email.");
        }
        check_required(&mut errors, "code", "Verification code", &self.code);
        errors.into_result()
    }
}

/// `/auth/login` response
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(rename = "ACCESS_TOKEN", alias = "access_token")]
    pub access_token: String,
}

/// Opaque bearer token; never printed
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

fn normalize_optional(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            username: "alice".into(),
            email: "alice@example.com".into(),
            name: "Alice Liddell".into(),
            password: "secret".into(),
            confirm_password: "secret".into(),
        }
    }

    #[test]
    fn test_task_draft_rules() {
        let short = TaskDraft::new("ab", None).validate().unwrap_err();
        assert_eq!(short.get("name"), Some("Name must be at least 3 characters"));

        let bad_description = TaskDraft::new("Buy milk", Some("x".into())).validate().unwrap_err();
        assert!(bad_description.get("name").is_none());
        assert_eq!(bad_description.get("description"), Some("Description must be at least 3 characters"));

        assert!(TaskDraft::new("Buy milk", Some("  ".into())).validate().is_ok());
    }

    #[test]
    fn test_task_draft_normalized_serialization() {
        let draft = TaskDraft::new("  Buy milk ", Some("   ".into())).normalized();
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Buy milk", "description": null}));
    }

    #[test]
    fn test_patch_only_checks_provided_fields() {
        assert!(TaskPatch::default().validate().is_ok());
        let patch = TaskPatch { name: None, description: Some(Some("ok".into())) };
        assert!(patch.validate().unwrap_err().get("description").is_some());

        let json = serde_json::to_value(TaskPatch::edit("Walk dog", None)).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Walk dog", "description": null}));
        let json = serde_json::to_value(TaskPatch { name: Some("Walk".into()), description: None }).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Walk"}));
    }

    #[test]
    fn test_reminder_requires_all_fields() {
        let draft = ReminderDraft { message: " ".into(), description: "d".into(), author: "".into() };
        let errors = draft.validate().unwrap_err();
        assert_eq!(errors.get("message"), Some("Message is required"));
        assert_eq!(errors.get("author"), Some("Author is required"));
        assert!(errors.get("description").is_none());
    }

    #[test]
    fn test_reminder_timestamp_formats() {
        let naive: Reminder = serde_json::from_str(
            r#"{"id":1,"message":"Call mom","description":"Sunday","author":"me","created_at":"2024-01-05T15:04:00.123456"}"#,
        )
        .unwrap();
        assert_eq!(naive.created_label(), "Jan 5, 2024, 03:04 PM");

        let zoned: Reminder = serde_json::from_str(
            r#"{"id":2,"message":"m","description":"d","author":"a","created_at":"2024-01-05T17:04:00+02:00"}"#,
        )
        .unwrap();
        assert_eq!(zoned.created_at, naive.created_at.with_timezone(&Utc) - chrono::Duration::microseconds(123456));
    }

    #[test]
    fn test_registration_rules() {
        assert!(registration().validate().is_ok());

        let mut r = registration();
        r.username = "x".repeat(51);
        r.email = "not-an-email".into();
        r.confirm_password = "other".into();
        let errors = r.validate().unwrap_err();
        assert_eq!(errors.get("username"), Some("Username must be less than 50 characters"));
        assert_eq!(errors.get("email"), Some("Please enter a valid email address"));
        assert_eq!(errors.get("confirm_password"), Some("Passwords do not match"));
        assert!(errors.get("name").is_none());
    }

    #[test]
    fn test_registration_never_sends_confirmation() {
        let json = serde_json::to_value(registration()).unwrap();
        assert!(json.get("confirm_password").is_none());
        assert_eq!(json["email"], "alice@example.com");
    }

    #[test]
    fn test_token_response_aliases() {
        let upper: TokenResponse = serde_json::from_str(r#"{"ACCESS_TOKEN":"abc","token_type":"bearer"}"#).unwrap();
        let lower: TokenResponse = serde_json::from_str(r#"{"access_token":"abc"}"#).unwrap();
        assert_eq!(upper.access_token, lower.access_token);
    }

    #[test]
    fn test_secrets_are_redacted() {
        let token = AccessToken::new("s3cr3t");
        assert!(!format!("{:?}", token).contains("s3cr3t"));
        assert_eq!(token.bearer(), "Bearer s3cr3t");
        let creds = Credentials { username: "bob".into(), password: "hunter2".into() };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
