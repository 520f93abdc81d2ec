use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::constants;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub run_id: String,
    /// Backend API endpoint.
    pub endpoint: String,
    /// Project containing the evidence to process.
    pub project: String,
    #[serde(default)]
    pub recipe: Option<String>,
    /// Zone the backend server runs in.
    pub zone: String,
    #[serde(default)]
    pub backend_config_file: Option<PathBuf>,
    /// Analysis workspace id; 0 means none.
    #[serde(default)]
    pub sketch_id: u64,
    /// Where processing results land; empty means allocate a scratch
    /// directory at configure time.
    #[serde(default)]
    pub output_directory: String,
    #[serde(default = "default_target_suffix")]
    pub target_suffix: String,
    #[serde(default = "default_backend_tmp_dir")]
    pub backend_tmp_dir: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default)]
    pub continue_on_error: bool,
}

fn default_target_suffix() -> String {
    constants::DEFAULT_TARGET_SUFFIX.to_string()
}

fn default_backend_tmp_dir() -> String {
    constants::DEFAULT_BACKEND_TMP_DIR.to_string()
}

fn default_pool_size() -> usize {
    num_cpus::get()
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub config_hash: String,
}

pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig> {
    let bytes: Vec<u8> = if let Some(p) = path {
        std::fs::read(p)?
    } else {
        include_bytes!("../config/default.yml").to_vec()
    };

    let mut config: Config = serde_yaml::from_slice(&bytes)?;
    if config.run_id.trim().is_empty() {
        config.run_id = generate_run_id();
    }

    let config_hash = hash_bytes(&bytes);

    Ok(LoadedConfig {
        config,
        config_hash,
    })
}

fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    hex::encode(digest)
}

fn generate_run_id() -> String {
    let now = chrono::Utc::now();
    format!("{}_{}", now.format("%Y%m%dT%H%M%SZ"), rand_suffix())
}

fn rand_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    format!("{:08x}", nanos)
}
