// API client module: a small blocking HTTP client for the Factorio mod
// portal's two-step release upload (init_upload, then a multipart POST to
// the URL it hands back).

use crate::config::{Config, Credentials};
use crate::error::{ReleaseError, Result};
use reqwest::blocking::{multipart, Client};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

pub const INIT_UPLOAD_PATH: &str = "/api/v2/mods/releases/init_upload";
pub const ARCHIVE_MIME: &str = "application/x-zip-compressed";

/// The registry side of a release.
pub trait Registry {
    /// Ask the registry for a one-shot upload URL for `mod_name`.
    fn init_upload(&self, mod_name: &str) -> Result<String>;

    /// Push the archive to a URL from `init_upload`. Returns the response body as-is.
    fn push_archive(&self, upload_url: &str, archive: &Path) -> Result<String>;
}

#[derive(Deserialize)]
struct InitUploadResponse {
    upload_url: Option<String>,
}

/// Pull `upload_url` out of an init_upload response body.
pub fn parse_upload_url(body: &str) -> Result<String> {
    let protocol = |message: &str| ReleaseError::Protocol {
        message: message.to_string(),
        body: body.to_string(),
    };
    let parsed: InitUploadResponse =
        serde_json::from_str(body).map_err(|_| protocol("could not parse init_upload response"))?;
    parsed
        .upload_url
        .ok_or_else(|| protocol("init_upload response has no `upload_url`"))
}

/// Blocking client for the mod portal.
#[derive(Clone)]
pub struct PortalClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl PortalClient {
    pub fn new(config: &Config) -> Result<Self> {
        // Uploads of large mods can take a while; no timeout.
        let client = Client::builder().timeout(None::<Duration>).build()?;
        if !config.credentials.is_present() {
            log::warn!(
                "{} is not set, requests will carry `Bearer None`",
                crate::config::API_KEY_VAR
            );
        }
        Ok(PortalClient {
            client,
            base_url: config.portal_url.clone(),
            credentials: config.credentials.clone(),
        })
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&self.credentials.bearer())
            .map_err(|e| ReleaseError::Credentials(e.to_string()))?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}

impl Registry for PortalClient {
    fn init_upload(&self, mod_name: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, INIT_UPLOAD_PATH);
        let res = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .form(&[("mod", mod_name)])
            .send()?;
        log::debug!("init_upload for {} returned {}", mod_name, res.status());
        // The status is not checked: error replies lack `upload_url` anyway
        // and the body is what tells the user what went wrong.
        let body = res.text()?;
        parse_upload_url(&body)
    }

    fn push_archive(&self, upload_url: &str, archive: &Path) -> Result<String> {
        let context = || format!("opening {}", archive.display());
        let file = File::open(archive).map_err(|e| ReleaseError::filesystem(context(), e))?;
        let length = file
            .metadata()
            .map_err(|e| ReleaseError::filesystem(context(), e))?
            .len();
        let file_name = archive
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mod.zip".to_string());

        // The file is moved into the request and closed when it is dropped.
        let part = multipart::Part::reader_with_length(file, length)
            .file_name(file_name)
            .mime_str(ARCHIVE_MIME)?;
        let form = multipart::Form::new().part("file", part);

        let res = self
            .client
            .post(upload_url)
            .headers(self.auth_headers()?)
            .multipart(form)
            .send()?;
        log::debug!("upload of {} returned {}", archive.display(), res.status());
        Ok(res.text()?)
    }
}
