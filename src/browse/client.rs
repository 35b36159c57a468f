use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{
    traits::BooksApi,
    types::{
        book::Book,
        page::{BooksPage, ErrorBody},
    },
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message} (status {status})")]
    Proxy { status: u16, message: String },
    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_path_to_error::Error<serde_json::Error>),
    #[error("Invalid proxy url: {0}")]
    Url(#[from] url::ParseError),
}

/// Talks to the books endpoint of a running proxy.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    http:     reqwest::Client,
    endpoint: Url,
}

impl ProxyClient {
    pub fn new(proxy_url: &str) -> Result<Self, ClientError> {
        let base = Url::parse(&format!("{}/", proxy_url.trim().trim_end_matches('/')))?;
        Ok(Self {
            http:     reqwest::Client::new(),
            endpoint: base.join("api/books")?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn page(&self, query: &str, limit: u32, offset: u32) -> Result<BooksPage<Book>, ClientError> {
        let limit = limit.to_string();
        let offset = offset.to_string();
        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&[("search", query), ("limit", limit.as_str()), ("offset", offset.as_str())])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("Proxy responded with {status}");

        if !status.is_success() {
            let message = match serde_json::from_str::<ErrorBody>(&body) {
                Ok(error) => error.error,
                Err(_) if body.trim().is_empty() => status.to_string(),
                Err(_) => body,
            };
            return Err(ClientError::Proxy {
                status: status.as_u16(),
                message,
            });
        }

        let mut deserializer = serde_json::Deserializer::from_str(&body);
        Ok(serde_path_to_error::deserialize(&mut deserializer)?)
    }
}

#[async_trait]
impl BooksApi for ProxyClient {
    async fn fetch(&self, query: &str, limit: u32, offset: u32) -> Result<BooksPage<Book>, ClientError> {
        self.page(query, limit, offset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_is_under_api() {
        let client = ProxyClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.endpoint().as_str(), "http://localhost:3000/api/books");
        let client = ProxyClient::new("https://example.org/catalog").unwrap();
        assert_eq!(client.endpoint().as_str(), "https://example.org/catalog/api/books");
    }
}
