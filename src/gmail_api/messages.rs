use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::pagination::{collect_pages, Page};
use crate::types::{Message, MessageRef, ModifyLabels, RawMessage};

use super::service::ME;
use super::{Gmail, GmailHandle};

/// Labels removed when archiving: the message leaves the inbox, read.
pub const ARCHIVE_REMOVED_LABELS: [&str; 2] = ["UNREAD", "INBOX"];
pub const TRASH_LABEL: &str = "TRASH";
pub const DEFAULT_FILE_SENDER: &str = "send.file@google.api";

/// Link to a Google Docs document.
pub fn document_url(file_id: &str) -> String {
    format!("https://docs.google.com/document/d/{}", file_id)
}

impl Gmail {
    /// Sends a pre-built message. `user_id` is an address or `"me"` for the
    /// authenticated user.
    pub async fn send(
        &self,
        user_id: &str,
        message: &RawMessage,
        service: Option<GmailHandle>,
    ) -> Result<Message> {
        self.service
            .apply(service, |service| async move {
                info!("Sending mail");
                let sent = service.send_message(user_id, message.clone()).await?;
                debug!("Sent message id: {}", sent.id);
                Ok(sent)
            })
            .await
    }

    /// Mails a link to a drive document, from `sender` or
    /// [`DEFAULT_FILE_SENDER`].
    pub async fn send_file(
        &self,
        mail_address: &str,
        mail_subject: &str,
        file_id: &str,
        sender: Option<&str>,
        service: Option<GmailHandle>,
    ) -> Result<Message> {
        info!("Sending file");
        debug!("File id: {}, to: {}", file_id, mail_address);
        let message = RawMessage::plain_text(
            sender.unwrap_or(DEFAULT_FILE_SENDER),
            mail_address,
            mail_subject,
            &document_url(file_id),
        );
        self.send(ME, &message, service).await
    }

    /// References (ids) of every message matching `query`, across all pages.
    ///
    /// Query syntax: https://support.google.com/mail/answer/7190
    pub async fn get_messages(&self, query: &str, service: Option<GmailHandle>) -> Result<Vec<MessageRef>> {
        self.service
            .apply(service, |service| async move {
                info!("Getting mails");
                debug!("Query: {}", query);
                collect_pages(|page_token| {
                    let service = Arc::clone(&service);
                    async move {
                        let response = service.list_messages(query, page_token).await?;
                        Ok::<_, Error>(Page::new(
                            response.messages.unwrap_or_default(),
                            response.next_page_token,
                        ))
                    }
                })
                .await
            })
            .await
    }

    /// Marks a message as read and removes it from the inbox, optionally
    /// tagging it with `extra_label` (a label id).
    pub async fn archive_message(
        &self,
        message_id: &str,
        extra_label: Option<&str>,
        service: Option<GmailHandle>,
    ) -> Result<Message> {
        self.service
            .apply(service, |service| async move {
                info!("Archiving mail");
                debug!("Message id: {}", message_id);
                let modify = ModifyLabels {
                    add_label_ids: extra_label.map(str::to_string).into_iter().collect(),
                    remove_label_ids: ARCHIVE_REMOVED_LABELS.iter().map(|l| l.to_string()).collect(),
                };
                service.modify_message(message_id, modify).await
            })
            .await
    }

    pub async fn move_to_trash(&self, message_id: &str, service: Option<GmailHandle>) -> Result<Message> {
        self.service
            .apply(service, |service| async move {
                info!("Moving mail to trash");
                debug!("Message id: {}", message_id);
                let modify = ModifyLabels {
                    add_label_ids: vec![TRASH_LABEL.to_string()],
                    remove_label_ids: Vec::new(),
                };
                service.modify_message(message_id, modify).await
            })
            .await
    }
}
