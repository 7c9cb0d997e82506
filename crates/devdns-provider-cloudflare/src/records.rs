//! Cloudflare zone A records as a [`RecordStore`]

use crate::api::ApiClient;
use async_trait::async_trait;
use devdns_core::traits::{DnsRecord, RECORD_TYPE_A, RecordStore};
use devdns_core::{Error, Result};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::Ipv4Addr;

/// A DNS record as listed by `GET /zones/:zone_id/dns_records`
#[derive(Debug, Deserialize)]
struct RecordEntry {
    id: String,
    name: String,
    content: String,
}

impl RecordEntry {
    fn into_record(self) -> Option<DnsRecord> {
        match self.content.parse::<Ipv4Addr>() {
            Ok(address) => Some(DnsRecord::new(self.id, self.name, address)),
            Err(_) => {
                tracing::warn!(
                    "Ignoring A record {} with unparsable content '{}'",
                    self.name,
                    self.content
                );
                None
            }
        }
    }
}

/// Cloudflare DNS zone record store
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, lookups still hit the API but create, update
/// and delete are only logged.
#[derive(Debug)]
pub struct CloudflareRecordStore {
    api: ApiClient,
    zone_id: String,
    record_ttl: u32,
    dry_run: bool,
}

impl CloudflareRecordStore {
    /// Create a new record store
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `api_token` or `zone_id` is empty.
    pub fn new(
        api_token: impl Into<String>,
        zone_id: impl Into<String>,
        record_ttl: u32,
        dry_run: bool,
    ) -> Result<Self> {
        let zone_id = zone_id.into();
        if zone_id.is_empty() {
            return Err(Error::config("Cloudflare zone ID cannot be empty"));
        }

        Ok(Self {
            api: ApiClient::new(api_token)?,
            zone_id,
            record_ttl,
            dry_run,
        })
    }

    /// Point the store at a different API base URL
    pub fn with_api_base(mut self, base_url: impl Into<String>) -> Self {
        self.api.set_base_url(base_url);
        self
    }

    /// Whether mutations are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn records_path(&self) -> String {
        format!("zones/{}/dns_records", self.zone_id)
    }

    fn record_path(&self, id: &str) -> String {
        format!("zones/{}/dns_records/{}", self.zone_id, id)
    }

    fn record_payload(&self, name: &str, address: Ipv4Addr) -> Value {
        json!({
            "type": RECORD_TYPE_A,
            "name": name,
            "content": address.to_string(),
            "ttl": self.record_ttl,
            "proxied": false,
        })
    }

    async fn list_first(&self, filter: (&str, &str), context: &str) -> Result<Option<DnsRecord>> {
        let entries: Vec<RecordEntry> = self
            .api
            .get(
                &self.records_path(),
                &[("type", RECORD_TYPE_A), filter],
                context,
            )
            .await?
            .unwrap_or_default();

        Ok(entries.into_iter().find_map(RecordEntry::into_record))
    }
}

#[async_trait]
impl RecordStore for CloudflareRecordStore {
    async fn find_record_by_name(&self, name: &str) -> Result<Option<DnsRecord>> {
        tracing::debug!("Looking up A record by name: {}", name);
        self.list_first(("name", name), "Record lookup by name").await
    }

    async fn find_record_by_address(&self, address: Ipv4Addr) -> Result<Option<DnsRecord>> {
        tracing::debug!("Looking up A record by address: {}", address);
        let content = address.to_string();
        self.list_first(("content", &content), "Record lookup by address")
            .await
    }

    /// `POST /zones/:zone_id/dns_records`
    async fn create_record(&self, name: &str, address: Ipv4Addr) -> Result<()> {
        let payload = self.record_payload(name, address);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                self.records_path(),
                payload
            );
            return Ok(());
        }

        self.api
            .send_json::<Value>(Method::POST, &self.records_path(), &payload, "Record create")
            .await?;
        tracing::info!("DNS record created: {} -> {}", name, address);
        Ok(())
    }

    /// `PUT /zones/:zone_id/dns_records/:record_id`
    async fn update_record(&self, id: &str, name: &str, address: Ipv4Addr) -> Result<()> {
        let payload = self.record_payload(name, address);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PUT request to {} with payload: {}",
                self.record_path(id),
                payload
            );
            return Ok(());
        }

        self.api
            .send_json::<Value>(Method::PUT, &self.record_path(id), &payload, "Record update")
            .await?;
        tracing::info!("DNS record updated: {} -> {}", name, address);
        Ok(())
    }

    /// `DELETE /zones/:zone_id/dns_records/:record_id`
    async fn delete_record(&self, id: &str) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send DELETE request to {}",
                self.record_path(id)
            );
            return Ok(());
        }

        self.api.delete(&self.record_path(id), "Record delete").await?;
        tracing::info!("DNS record deleted: {}", id);
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "cloudflare"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_zone_rejected() {
        let result = CloudflareRecordStore::new("token", "", 60, false);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_payload_shape() {
        let store = CloudflareRecordStore::new("token", "zone", 120, false).unwrap();
        let payload = store.record_payload("laptop.example.com", Ipv4Addr::new(10, 0, 0, 7));
        assert_eq!(
            payload,
            json!({
                "type": "A",
                "name": "laptop.example.com",
                "content": "10.0.0.7",
                "ttl": 120,
                "proxied": false,
            })
        );
    }

    #[test]
    fn test_non_ipv4_content_skipped() {
        let entry = RecordEntry {
            id: "r1".to_string(),
            name: "odd.example.com".to_string(),
            content: "not-an-ip".to_string(),
        };
        assert!(entry.into_record().is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let store = CloudflareRecordStore::new("secret_token_12345", "zone", 60, true).unwrap();
        let debug_str = format!("{:?}", store);
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("dry_run: true"));
    }
}
