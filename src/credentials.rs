// src/credentials.rs
//! Credentials for the storage under test: S3 keys kept in a small JSON file,
//! and the Ceph admin key read from a monitor.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::constants::CEPH_ADMIN_KEYRING;
use crate::error::{BenchError, Result};
use crate::ssh::RemoteExec;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Keys {
    pub access_key: String,
    pub secret_key: String,
}

impl S3Keys {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct RadosgwUser {
    #[serde(default)]
    keys: Vec<S3Keys>,
}

/// Pull the first key pair out of `radosgw-admin user create` output.
pub fn parse_radosgw_user(output: &str) -> Result<S3Keys> {
    let user: RadosgwUser = serde_json::from_str(output)?;
    user.keys
        .into_iter()
        .next()
        .ok_or_else(|| BenchError::config("radosgw-admin returned a user without keys"))
}

/// Create an S3 user on a rados gateway and return its keys.
pub fn add_s3_user(shell: &dyn RemoteExec, username: &str) -> Result<S3Keys> {
    info!("Adding S3 user {} on {}", username, shell.host());
    let out = shell.exec(&format!(
        "radosgw-admin user create --uid={} --display-name={}",
        username, username
    ))?;
    parse_radosgw_user(&out)
}

/// Read the admin key from a monitor's keyring.
pub fn fetch_ceph_key(shell: &dyn RemoteExec) -> Result<String> {
    info!("Fetching key from {}:{}", shell.host(), CEPH_ADMIN_KEYRING);
    let key = shell.exec(&format!(
        "grep key {} | awk '{{print $3}}'",
        CEPH_ADMIN_KEYRING
    ))?;
    if key.is_empty() {
        return Err(BenchError::Remote {
            host: shell.host().to_string(),
            message: format!("no key found in {}", CEPH_ADMIN_KEYRING),
        });
    }
    Ok(key)
}
