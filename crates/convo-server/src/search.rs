use anyhow::Result;
use futures_util::future::BoxFuture;
use reqwest::Client;
use uuid::Uuid;

use convo_core::SearchClient;
use convo_types::UserPartial;

/// Search index reached over HTTP: documents live at
/// `{base_url}/users/{id}`.
pub struct HttpSearchClient {
    client: Client,
    base_url: String,
}

impl HttpSearchClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn document_url(&self, user_id: Uuid) -> String {
        format!("{}/users/{}", self.base_url, user_id)
    }
}

impl SearchClient for HttpSearchClient {
    fn update<'a>(&'a self, user: &'a UserPartial) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.client
                .put(self.document_url(user.id))
                .json(user)
                .send()
                .await?
                .error_for_status()?;
            Ok(())
        })
    }

    fn delete(&self, user_id: Uuid) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.client
                .delete(self.document_url(user_id))
                .send()
                .await?
                .error_for_status()?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_urls_ignore_trailing_slash() {
        let id = Uuid::nil();
        let client = HttpSearchClient::new("http://search:9200/");
        assert_eq!(
            client.document_url(id),
            format!("http://search:9200/users/{id}")
        );
    }
}
