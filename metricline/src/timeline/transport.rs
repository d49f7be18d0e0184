use std::fmt;

use async_trait::async_trait;
use futures_util::TryFutureExt;
use reqwest::Method;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use url::Url;

use crate::error::{CollectionError, ConfigurationError};
use crate::settings::CollectorSettings;

/// Reads a collector response body.
#[async_trait]
pub trait MetricsTransport: Send + Sync {
    async fn read_from(&self, url: &Url) -> Result<Vec<u8>, CollectionError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: ClientWithMiddleware,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport").finish()
    }
}

impl HttpTransport {
    pub const fn new(client: ClientWithMiddleware) -> Self {
        Self { client }
    }

    pub fn from_settings(settings: &CollectorSettings) -> Result<Self, ConfigurationError> {
        make_http_client(settings).map(Self::new)
    }
}

fn make_http_client(settings: &CollectorSettings) -> Result<ClientWithMiddleware, ConfigurationError> {
    let headers = settings.header_map()?;

    let client_builder = reqwest::Client::builder()
        .pool_idle_timeout(settings.pool_idle_timeout)
        .default_headers(headers);

    let client_builder = if let Some(timeout) = settings.timeout {
        client_builder.timeout(timeout)
    } else {
        client_builder
    };

    let client_builder = if let Some(pool_max_idle_per_host) = settings.pool_max_idle_per_host {
        client_builder.pool_max_idle_per_host(pool_max_idle_per_host)
    } else {
        client_builder
    };

    let client = client_builder.build()?;

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(settings.max_retries);
    Ok(ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

#[async_trait]
impl MetricsTransport for HttpTransport {
    #[tracing::instrument(level = "trace", skip(self))]
    async fn read_from(&self, url: &Url) -> Result<Vec<u8>, CollectionError> {
        let body = self
            .client
            .request(Method::GET, url.clone())
            .send()
            .map_err(|error| {
                tracing::error!(?error, "failed collector timeline metrics request");
                CollectionError::from(error)
            })
            .and_then(|response| async move {
                super::log_response("timeline metrics", &response);
                let response = response.error_for_status()?;
                response.bytes().await.map_err(CollectionError::from)
            })
            .await?;

        Ok(body.to_vec())
    }
}
