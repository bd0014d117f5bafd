use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{service} responded with {status}: {body}")]
    Status {
        service: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("failed to parse feed: {0}")]
    Feed(#[from] feed_rs::parser::ParseFeedError),
    #[error("{0} returned an empty response")]
    EmptyResponse(&'static str),
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
}

impl DigestError {
    /// Drains a non-success response into a `Status` error.
    pub async fn from_response(service: &'static str, response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        Self::Status {
            service,
            status,
            body,
        }
    }
}
