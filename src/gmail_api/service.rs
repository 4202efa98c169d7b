use async_trait::async_trait;
use tracing::info;

use crate::auth::Credentials;
use crate::config::ApiOptions;
use crate::error::Result;
use crate::http::ApiClient;
use crate::types::{Label, LabelsResponse, Message, MessagesResponse, ModifyLabels, NewLabel, RawMessage};

/// The authenticated user, as the API spells it.
pub const ME: &str = "me";

// Define a trait for the Gmail v1 endpoints to allow mocking
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GmailApi: Send + Sync {
    async fn list_labels(&self) -> Result<Vec<Label>>;

    async fn create_label(&self, label: NewLabel) -> Result<Label>;

    async fn delete_label(&self, label_id: &str) -> Result<()>;

    async fn send_message(&self, user_id: &str, message: RawMessage) -> Result<Message>;

    /// One page of message references matching `query`.
    async fn list_messages(&self, query: &str, page_token: Option<String>)
        -> Result<MessagesResponse>;

    async fn modify_message(&self, message_id: &str, modify: ModifyLabels) -> Result<Message>;
}

/// The Gmail v1 REST API.
pub struct GmailService {
    api: ApiClient,
    base_url: String,
}

impl GmailService {
    pub fn new(client: reqwest::Client, credentials: Credentials, options: &ApiOptions) -> Self {
        info!("Instantiating gmail service");
        Self {
            api: ApiClient::new(client, credentials, options.retry.clone()),
            base_url: options.gmail_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn user_url(&self, user_id: &str, path: &str) -> String {
        format!("{}/users/{}/{}", self.base_url, user_id, path)
    }
}

#[async_trait]
impl GmailApi for GmailService {
    async fn list_labels(&self) -> Result<Vec<Label>> {
        let response: LabelsResponse = self.api.get_json(&self.user_url(ME, "labels"), &[]).await?;
        Ok(response.labels.unwrap_or_default())
    }

    async fn create_label(&self, label: NewLabel) -> Result<Label> {
        self.api
            .post_json(&self.user_url(ME, "labels"), &[], &label)
            .await
    }

    async fn delete_label(&self, label_id: &str) -> Result<()> {
        self.api
            .delete(&self.user_url(ME, &format!("labels/{}", label_id)))
            .await
    }

    async fn send_message(&self, user_id: &str, message: RawMessage) -> Result<Message> {
        self.api
            .post_json(&self.user_url(user_id, "messages/send"), &[], &message)
            .await
    }

    async fn list_messages(
        &self,
        query: &str,
        page_token: Option<String>,
    ) -> Result<MessagesResponse> {
        let mut params = vec![("q", query.to_string())];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        self.api
            .get_json(&self.user_url(ME, "messages"), &params)
            .await
    }

    async fn modify_message(&self, message_id: &str, modify: ModifyLabels) -> Result<Message> {
        self.api
            .post_json(
                &self.user_url(ME, &format!("messages/{}/modify", message_id)),
                &[],
                &modify,
            )
            .await
    }
}
