//! Vultr v2 REST client.
//!
//! Blocking client with bearer auth. List endpoints follow the API's
//! cursor pagination until the `next` link comes back empty.

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{GovernorError, Result};

use super::{CloudApi, Instance, InstanceRequest, Volume, VolumeRequest};

/// Default API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.vultr.com/v2";

const PAGE_SIZE: &str = "100";

/// Talks to the Vultr API.
pub struct VultrClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default)]
    next: String,
}

#[derive(Debug, Deserialize)]
struct InstancePage {
    #[serde(default)]
    instances: Vec<Instance>,
    #[serde(default)]
    meta: Meta,
}

#[derive(Debug, Deserialize)]
struct BlockPage {
    #[serde(default)]
    blocks: Vec<Volume>,
    #[serde(default)]
    meta: Meta,
}

#[derive(Debug, Deserialize)]
struct InstanceEnvelope {
    instance: Instance,
}

#[derive(Debug, Deserialize)]
struct BlockEnvelope {
    block: Volume,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct AttachBody<'a> {
    instance_id: &'a str,
    live: bool,
}

impl VultrClient {
    /// Create a client against `base_url` with a 30-second timeout.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        Self::with_timeout(base_url, api_key, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("mcgov/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| GovernorError::Transport {
                operation: "build-client".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
    }

    fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response> {
        debug!("Vultr API call {}", operation);
        let response = request.send().map_err(|e| GovernorError::Transport {
            operation: operation.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| body.trim().to_string());

        Err(GovernorError::Api {
            operation: operation.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    fn send_json<T: DeserializeOwned>(&self, operation: &str, request: RequestBuilder) -> Result<T> {
        self.send(operation, request)?
            .json::<T>()
            .map_err(|e| GovernorError::Transport {
                operation: operation.to_string(),
                message: format!("unreadable response: {}", e),
            })
    }
}

impl CloudApi for VultrClient {
    fn list_instances(&self, label: &str, region: &str) -> Result<Vec<Instance>> {
        let mut instances = Vec::new();
        let mut cursor = String::new();

        loop {
            let mut query = vec![("per_page", PAGE_SIZE), ("label", label), ("region", region)];
            if !cursor.is_empty() {
                query.push(("cursor", cursor.as_str()));
            }
            let request = self.request(Method::GET, "/instances").query(&query);
            let page: InstancePage = self.send_json("list-instances", request)?;

            instances.extend(page.instances);
            cursor = page.meta.links.next;
            if cursor.is_empty() {
                break;
            }
        }

        // The label filter is a hint to the API; match exactly here.
        instances.retain(|i| i.label == label && i.region == region);
        Ok(instances)
    }

    fn create_instance(&self, request: &InstanceRequest) -> Result<Instance> {
        let builder = self.request(Method::POST, "/instances").json(request);
        let envelope: InstanceEnvelope = self.send_json("create-instance", builder)?;
        Ok(envelope.instance)
    }

    fn get_instance(&self, id: &str) -> Result<Instance> {
        let builder = self.request(Method::GET, &format!("/instances/{}", id));
        let envelope: InstanceEnvelope = self.send_json("get-instance", builder)?;
        Ok(envelope.instance)
    }

    fn delete_instance(&self, id: &str) -> Result<()> {
        let builder = self.request(Method::DELETE, &format!("/instances/{}", id));
        self.send("delete-instance", builder)?;
        Ok(())
    }

    fn list_volumes(&self, label: &str) -> Result<Vec<Volume>> {
        let mut volumes = Vec::new();
        let mut cursor = String::new();

        loop {
            let mut query = vec![("per_page", PAGE_SIZE)];
            if !cursor.is_empty() {
                query.push(("cursor", cursor.as_str()));
            }
            let request = self.request(Method::GET, "/blocks").query(&query);
            let page: BlockPage = self.send_json("list-volumes", request)?;

            volumes.extend(page.blocks);
            cursor = page.meta.links.next;
            if cursor.is_empty() {
                break;
            }
        }

        volumes.retain(|v| v.label == label);
        Ok(volumes)
    }

    fn create_volume(&self, request: &VolumeRequest) -> Result<Volume> {
        let builder = self.request(Method::POST, "/blocks").json(request);
        let envelope: BlockEnvelope = self.send_json("create-volume", builder)?;
        Ok(envelope.block)
    }

    fn attach_volume(&self, volume_id: &str, instance_id: &str, live: bool) -> Result<()> {
        let body = AttachBody { instance_id, live };
        let builder = self
            .request(Method::POST, &format!("/blocks/{}/attach", volume_id))
            .json(&body);
        self.send("attach-volume", builder)?;
        Ok(())
    }
}
