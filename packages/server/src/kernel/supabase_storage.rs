use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::BaseStorage;

/// Supabase Storage client using the service role key
pub struct SupabaseStorage {
    base_url: String,
    service_key: String,
    client: reqwest::Client,
}

/// Storage list request
#[derive(Debug, Serialize)]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: u32,
    offset: u32,
}

/// One object entry from a list call
#[derive(Debug, Deserialize)]
struct ObjectEntry {
    name: String,
}

/// Storage bulk delete request
#[derive(Debug, Serialize)]
struct RemoveRequest<'a> {
    prefixes: &'a [String],
}

impl SupabaseStorage {
    pub fn new(base_url: String, service_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            client,
        })
    }
}

#[async_trait]
impl BaseStorage for SupabaseStorage {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let url = format!("{}/storage/v1/object/list/{}", self.base_url, bucket);
        let request = ListRequest {
            prefix,
            limit: 10_000,
            offset: 0,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send Supabase list request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Supabase storage error {}: {}", status, body);
        }

        let entries: Vec<ObjectEntry> = response
            .json()
            .await
            .context("Failed to parse Supabase list response")?;

        // The list endpoint returns names relative to the prefix.
        let prefix = prefix.trim_end_matches('/');
        let paths = entries
            .into_iter()
            .map(|e| {
                if prefix.is_empty() {
                    e.name
                } else {
                    format!("{}/{}", prefix, e.name)
                }
            })
            .collect();

        Ok(paths)
    }

    async fn remove_objects(&self, bucket: &str, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }

        let url = format!("{}/storage/v1/object/{}", self.base_url, bucket);
        let request = RemoveRequest { prefixes: paths };

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send Supabase delete request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Supabase storage error {}: {}", status, body);
        }

        tracing::info!(bucket, count = paths.len(), "Removed storage objects");

        Ok(())
    }
}
