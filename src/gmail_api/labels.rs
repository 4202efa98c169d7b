use tracing::{debug, info};

use crate::error::Result;
use crate::types::{Label, NewLabel};

use super::{Gmail, GmailHandle};

impl Gmail {
    /// Every label of the user's mailbox, system labels included.
    pub async fn get_labels(&self, service: Option<GmailHandle>) -> Result<Vec<Label>> {
        self.service
            .apply(service, |service| async move {
                info!("Fetching labels");
                let labels = service.list_labels().await?;
                debug!("Retrieved {} labels", labels.len());
                Ok(labels)
            })
            .await
    }

    pub async fn create_label(&self, label_name: &str, service: Option<GmailHandle>) -> Result<Label> {
        self.service
            .apply(service, |service| async move {
                info!("Creating label");
                debug!("Label name: {}", label_name);
                service.create_label(NewLabel::visible(label_name)).await
            })
            .await
    }

    pub async fn delete_label(&self, label_id: &str, service: Option<GmailHandle>) -> Result<()> {
        self.service
            .apply(service, |service| async move {
                info!("Deleting label");
                debug!("Label id: {}", label_id);
                service.delete_label(label_id).await
            })
            .await
    }
}
