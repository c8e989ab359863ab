use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ChannelMetadata {
    #[serde(default)]
    pub provider: Option<String>,
}

/// Read-only lookup of channel metadata, used to learn the channel's provider
#[derive(Clone)]
pub struct MetadataService {
    client: reqwest::Client,
    api_base: String,
}

impl MetadataService {
    pub fn new(api_base: &str, timeout: Duration) -> Self {
        Self {
            client: Self::build_client(timeout),
            api_base: api_base.to_string(),
        }
    }

    fn build_client(timeout: Duration) -> reqwest::Client {
        match reqwest::Client::builder().timeout(timeout).gzip(true).build() {
            Ok(client) => client,
            Err(e) => {
                warn!(
                    "[Metadata] Failed to build HTTP client, lookups run without the {:?} timeout: {}",
                    timeout, e
                );
                reqwest::Client::new()
            }
        }
    }

    /// `{api_base}/channels/{channel_id}/`
    pub fn channel_url(&self, channel_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)
            .with_context(|| format!("Invalid metadata API base: {}", self.api_base))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Metadata API base cannot have a path: {}", self.api_base))?
            .pop_if_empty()
            .push("channels")
            .push(channel_id)
            .push("");
        Ok(url)
    }

    pub async fn fetch_channel(&self, channel_id: &str) -> Result<ChannelMetadata> {
        if channel_id.is_empty() {
            return Err(anyhow::anyhow!("No channel id to look up"));
        }

        let url = self.channel_url(channel_id)?;
        debug!("[Metadata] GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Channel metadata request failed")?
            .error_for_status()
            .context("Channel metadata request rejected")?;

        response
            .json::<ChannelMetadata>()
            .await
            .context("Channel metadata was not valid JSON")
    }
}
