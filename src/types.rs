use base64::engine::general_purpose::URL_SAFE;
use base64::engine::Engine;
use serde::{Deserialize, Serialize};

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    pub next_page_token: Option<String>,
}

/// Metadata sent when creating, copying or updating a file.
#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<String>>,
}

impl FileMetadata {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            mime_type: Some(FOLDER_MIME_TYPE.to_string()),
            ..Self::named(name)
        }
    }

    pub fn in_folder(mut self, parent_folder_id: Option<&str>) -> Self {
        self.parents = parent_folder_id.map(|id| vec![id.to_string()]);
        self
    }
}

/// File content for an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Deserialize)]
pub struct LabelsResponse {
    pub labels: Option<Vec<Label>>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub label_type: Option<String>,
    pub message_list_visibility: Option<String>,
    pub label_list_visibility: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewLabel {
    pub name: String,
    pub message_list_visibility: String,
    pub label_list_visibility: String,
}

impl NewLabel {
    /// A label shown both in the label list and on messages.
    pub fn visible(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message_list_visibility: "show".to_string(),
            label_list_visibility: "labelShow".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessagesResponse {
    pub messages: Option<Vec<MessageRef>>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    pub thread_id: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub thread_id: Option<String>,
    pub label_ids: Option<Vec<String>>,
}

/// A complete RFC 822 message, base64url encoded as the send endpoint expects.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub raw: String,
}

impl RawMessage {
    pub fn from_rfc822(message: impl AsRef<[u8]>) -> Self {
        Self {
            raw: URL_SAFE.encode(message.as_ref()),
        }
    }

    /// A single-part `text/plain` message.
    pub fn plain_text(from: &str, to: &str, subject: &str, body: &str) -> Self {
        let mut message = String::new();
        message.push_str(&format!("From: {}\r\n", from));
        message.push_str(&format!("To: {}\r\n", to));
        message.push_str(&format!("Subject: {}\r\n", subject));
        message.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        message.push_str("\r\n");
        message.push_str(body);
        Self::from_rfc822(message)
    }
}

#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModifyLabels {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add_label_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remove_label_ids: Vec<String>,
}
