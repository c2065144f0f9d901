use std::path::Path;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

use crate::config::Config;
use crate::error::{Result, UpdateError};
use crate::templates::Template;
use crate::values;

pub struct UpdateOptions {
    /// Reset to the chart defaults instead of reusing the stored values.
    pub reset_values: bool,
}

/// The release-management service as the update command sees it.
pub trait ReleaseService {
    fn stored_values(&self, release: &str) -> Result<Mapping>;
    fn current_templates(&self, release: &str) -> Result<Vec<Template>>;
    fn submit_update(
        &self,
        release: &str,
        templates: Option<&[Template]>,
        values: &[u8],
        options: &UpdateOptions,
    ) -> Result<()>;
}

pub struct HttpReleaseService {
    base_url: String,
    http: reqwest::blocking::Client,
}

#[derive(Serialize, Deserialize)]
struct TemplateWire {
    name: String,
    data: String,
}

#[derive(Serialize)]
struct UpdateRequest {
    values: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    templates: Option<Vec<TemplateWire>>,
    reuse_values: bool,
    reset_values: bool,
}

impl HttpReleaseService {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder().timeout(Duration::from_secs(30));

        if let Some(tls) = &config.tls {
            let ca = read_pem(&tls.ca_cert)?;
            let ca = reqwest::Certificate::from_pem(&ca)
                .map_err(|e| UpdateError::Remote(format!("invalid CA certificate: {e}")))?;
            let cert = read_pem(&tls.cert)?;
            let key = read_pem(&tls.key)?;
            let identity = reqwest::Identity::from_pkcs8_pem(&cert, &key)
                .map_err(|e| UpdateError::Remote(format!("invalid client certificate: {e}")))?;

            builder = builder.add_root_certificate(ca).identity(identity);
            if !tls.verify {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        let host = config.host.trim_end_matches('/');
        let base_url = if host.contains("://") {
            host.to_string()
        } else if config.tls.is_some() {
            format!("https://{host}")
        } else {
            format!("http://{host}")
        };

        let http = builder
            .build()
            .map_err(|e| UpdateError::Remote(e.to_string()))?;

        Ok(Self { base_url, http })
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response> {
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|e| UpdateError::Remote(e.to_string()))?;
        check_status(url, response)
    }
}

impl ReleaseService for HttpReleaseService {
    fn stored_values(&self, release: &str) -> Result<Mapping> {
        let url = format!("{}/releases/{release}/values", self.base_url);
        let text = self
            .get(&url)?
            .text()
            .map_err(|e| UpdateError::Remote(e.to_string()))?;

        let parsed = serde_yaml::from_str(&text).map_err(|e| {
            UpdateError::Remote(format!("release {release} returned malformed values: {e}"))
        })?;
        values::document_from(parsed).map_err(|reason| {
            UpdateError::Remote(format!(
                "release {release} returned malformed values: {reason}"
            ))
        })
    }

    fn current_templates(&self, release: &str) -> Result<Vec<Template>> {
        let url = format!("{}/releases/{release}/templates", self.base_url);
        let wires: Vec<TemplateWire> = self
            .get(&url)?
            .json()
            .map_err(|e| UpdateError::Remote(e.to_string()))?;

        wires
            .into_iter()
            .map(|wire| {
                let data = BASE64.decode(&wire.data).map_err(|e| {
                    UpdateError::Remote(format!(
                        "release {release} returned malformed template {}: {e}",
                        wire.name
                    ))
                })?;
                Ok(Template {
                    name: wire.name,
                    data,
                })
            })
            .collect()
    }

    fn submit_update(
        &self,
        release: &str,
        templates: Option<&[Template]>,
        values: &[u8],
        options: &UpdateOptions,
    ) -> Result<()> {
        let url = format!("{}/releases/{release}", self.base_url);
        let body = UpdateRequest {
            values: BASE64.encode(values),
            templates: templates.map(|templates| {
                templates
                    .iter()
                    .map(|t| TemplateWire {
                        name: t.name.clone(),
                        data: BASE64.encode(&t.data),
                    })
                    .collect()
            }),
            reuse_values: !options.reset_values,
            reset_values: options.reset_values,
        };

        let response = self
            .http
            .put(&url)
            .json(&body)
            .send()
            .map_err(|e| UpdateError::Remote(e.to_string()))?;
        check_status(&url, response)?;
        Ok(())
    }
}

fn check_status(
    url: &str,
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(UpdateError::Remote(format!(
        "{url} returned {status}: {}",
        body.trim()
    )))
}

fn read_pem(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| UpdateError::Io {
        path: path.to_path_buf(),
        source,
    })
}
