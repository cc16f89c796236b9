//! IPFS HTTP API client
//!
//! Three calls: a version probe (required before any command that needs
//! IPFS), content add, and content cat. `cat` streams; the archive is never
//! held in memory.

use crate::error::{Result, TpkmError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct VersionResponse {
    #[serde(rename = "Version")]
    version: String,
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

pub struct IpfsClient {
    base: String,
    http: reqwest::blocking::Client,
}

fn is_not_found_body(body: &str) -> bool {
    let lowered = body.to_lowercase();
    lowered.contains("not found")
        || lowered.contains("no link named")
        || lowered.contains("could not resolve")
        || lowered.contains("invalid cid")
}

impl IpfsClient {
    pub fn new(api_url: &str) -> Result<IpfsClient> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| TpkmError::Unknown(format!("cannot build HTTP client: {e}")))?;
        Ok(IpfsClient {
            base: api_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.base
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{name}", self.base)
    }

    /// Liveness probe; any command that needs IPFS calls this first
    pub fn probe(&self) -> Result<String> {
        let response = self
            .http
            .post(self.endpoint("version"))
            .send()
            .map_err(|e| TpkmError::IpfsUnreachable(format!("{}: {e}", self.base)))?;
        if !response.status().is_success() {
            return Err(TpkmError::IpfsUnreachable(format!(
                "{}: HTTP {}",
                self.base,
                response.status()
            )));
        }
        let parsed: VersionResponse = response
            .json()
            .map_err(|e| TpkmError::IpfsUnreachable(format!("{}: {e}", self.base)))?;
        Ok(parsed.version)
    }

    /// Upload a file, returning its CID
    pub fn add_file(&self, path: &Path) -> Result<String> {
        let form = reqwest::blocking::multipart::Form::new()
            .file("file", path)
            .map_err(|e| TpkmError::Io(format!("cannot read {}: {e}", path.display())))?;
        let response = self
            .http
            .post(self.endpoint("add"))
            .multipart(form)
            .send()
            .map_err(|e| TpkmError::IpfsUnreachable(format!("add failed: {e}")))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(TpkmError::Unknown(format!(
                "IPFS add failed: HTTP {status}: {body}"
            )));
        }
        let parsed: AddResponse = response
            .json()
            .map_err(|e| TpkmError::Unknown(format!("bad IPFS add response: {e}")))?;
        if parsed.hash.is_empty() {
            return Err(TpkmError::Unknown(
                "IPFS add returned an empty CID".to_string(),
            ));
        }
        Ok(parsed.hash)
    }

    /// Fetch content by CID as a byte stream
    pub fn cat(&self, cid: &str) -> Result<reqwest::blocking::Response> {
        let response = self
            .http
            .post(self.endpoint("cat"))
            .query(&[("arg", cid)])
            .send()
            .map_err(|e| TpkmError::IpfsUnreachable(format!("cat failed: {e}")))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            if is_not_found_body(&body) {
                return Err(TpkmError::IpfsNotFound(cid.to_string()));
            }
            return Err(TpkmError::Unknown(format!(
                "IPFS cat failed: HTTP {status}: {body}"
            )));
        }
        Ok(response)
    }
}
