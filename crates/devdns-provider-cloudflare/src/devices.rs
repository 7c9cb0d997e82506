//! Cloudflare Zero Trust device registry as a [`DeviceDirectory`]

use crate::api::ApiClient;
use async_trait::async_trait;
use devdns_core::traits::DeviceDirectory;
use devdns_core::{Error, Result};
use serde::Deserialize;
use std::net::Ipv4Addr;

/// Device details from `GET /accounts/:account_id/devices/:device_id`
#[derive(Debug, Deserialize)]
struct DeviceDetails {
    #[serde(default)]
    ip: Option<String>,
}

/// Cloudflare Zero Trust device directory
#[derive(Debug)]
pub struct CloudflareDeviceDirectory {
    api: ApiClient,
    account_id: String,
}

impl CloudflareDeviceDirectory {
    /// Create a new device directory
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `api_token` or `account_id` is empty.
    pub fn new(api_token: impl Into<String>, account_id: impl Into<String>) -> Result<Self> {
        let account_id = account_id.into();
        if account_id.is_empty() {
            return Err(Error::config("Cloudflare account ID cannot be empty"));
        }

        Ok(Self {
            api: ApiClient::new(api_token)?,
            account_id,
        })
    }

    /// Point the directory at a different API base URL
    pub fn with_api_base(mut self, base_url: impl Into<String>) -> Self {
        self.api.set_base_url(base_url);
        self
    }

    /// Fetch the device and parse its reported address
    ///
    /// `Ok(None)` means the device exists but reports no IPv4 address.
    async fn fetch_address(&self, device_id: &str) -> Result<Option<Ipv4Addr>> {
        if !is_path_safe(device_id) {
            return Err(Error::invalid_input(format!(
                "Device id contains unsupported characters: {:?}",
                device_id
            )));
        }

        let path = format!("accounts/{}/devices/{}", self.account_id, device_id);
        let details: Option<DeviceDetails> = self.api.get(&path, &[], "Device lookup").await?;

        let Some(ip) = details.and_then(|d| d.ip) else {
            return Ok(None);
        };

        match ip.parse::<Ipv4Addr>() {
            Ok(address) => Ok(Some(address)),
            Err(_) => {
                tracing::debug!("Device {} reports non-IPv4 address '{}'", device_id, ip);
                Ok(None)
            }
        }
    }
}

// Device ids are interpolated into the request path
fn is_path_safe(device_id: &str) -> bool {
    !device_id.is_empty()
        && device_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        && device_id != "."
        && device_id != ".."
}

#[async_trait]
impl DeviceDirectory for CloudflareDeviceDirectory {
    async fn lookup_device(&self, device_id: &str) -> Option<Ipv4Addr> {
        match self.fetch_address(device_id).await {
            Ok(Some(address)) => Some(address),
            Ok(None) => {
                tracing::warn!("Device {} has no IPv4 address", device_id);
                None
            }
            Err(e) => {
                tracing::warn!("Device lookup failed for {}: {}", device_id, e);
                None
            }
        }
    }

    fn directory_name(&self) -> &'static str {
        "cloudflare"
    }
}
