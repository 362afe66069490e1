use crate::error::{Result, SoundTouchError};
use crate::protocol::Endpoint;
use crate::xml::XmlElement;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Low-level HTTP connection to one speaker
///
/// Knows how to fetch an XML document and how to post one; it does not
/// interpret the documents.
#[derive(Debug, Clone)]
pub struct Connection {
    http: reqwest::Client,
    base_url: String,
}

impl Connection {
    /// Create a connection to the speaker at `host:port`
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            base_url: format!("http://{}:{}", host, port),
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a resource and parse the XML body
    pub async fn get(&self, endpoint: Endpoint) -> Result<XmlElement> {
        let url = format!("{}{}", self.base_url, endpoint.path());
        tracing::trace!("GET {}", url);

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SoundTouchError::Status {
                path: endpoint.path().to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        tracing::trace!("Received: {}", String::from_utf8_lossy(&body));

        XmlElement::parse(&body)
    }

    /// POST an XML document to a resource
    ///
    /// The device acknowledges with a small status document which carries
    /// no information about the resulting state, so it is discarded.
    pub async fn post(&self, endpoint: Endpoint, body: &XmlElement) -> Result<()> {
        let url = format!("{}{}", self.base_url, endpoint.path());
        let payload = body.to_xml()?;
        tracing::debug!("POST {}: {}", url, payload);

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SoundTouchError::Status {
                path: endpoint.path().to_string(),
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}
