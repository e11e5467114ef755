use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

/// Options for acquiring a token from the identity service.
#[derive(Deserialize, Serialize, Clone)]
pub struct Options {
    /// Base url of the identity service, with or without the version, e.g.
    /// `https://keystone.example.com/v3`.
    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub domain_name: String,

    #[serde(default)]
    pub domain_id: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Extra PEM root certificate used to verify the identity service.
    #[serde(default)]
    pub ca_cert_path: String,

    #[serde(default)]
    pub client_cert_path: String,

    #[serde(default)]
    pub client_key_path: String,

    /// Request timeout, 0 means no timeout.
    #[serde(default = "Options::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            domain_name: String::new(),
            domain_id: String::new(),
            username: String::new(),
            password: String::new(),
            ca_cert_path: String::new(),
            client_cert_path: String::new(),
            client_key_path: String::new(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

impl Options {
    pub const DEFAULT_CONFIG_NAME: &'static str = "keystone-token.toml";

    /// Read the config file, a missing file yields the defaults. Env values
    /// are left as is so that the caller can apply overrides before
    /// [`Options::complete`].
    pub fn read(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        Self::read_file(&path)
    }

    fn read_file(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(s) => toml::from_str(&s)
                .with_context(|| format!("parse config file '{}' toml", path.display())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(
                    "Config file '{}' not found, using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(err) => Err(err).with_context(|| format!("read config file '{}'", path.display())),
        }
    }

    /// Fill empty fields from the standard OpenStack client environment.
    pub fn merge_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields = [
            ("OS_AUTH_URL", &mut self.endpoint),
            ("OS_USERNAME", &mut self.username),
            ("OS_PASSWORD", &mut self.password),
            ("OS_USER_DOMAIN_NAME", &mut self.domain_name),
            ("OS_USER_DOMAIN_ID", &mut self.domain_id),
            ("OS_CACERT", &mut self.ca_cert_path),
            ("OS_CERT", &mut self.client_cert_path),
            ("OS_KEY", &mut self.client_key_path),
        ];
        for (key, field) in fields {
            if !field.is_empty() {
                continue;
            }
            if let Some(value) = lookup(key) {
                *field = value;
            }
        }
    }

    /// Expand env values. The password is taken literally.
    pub fn complete(&mut self) -> Result<()> {
        self.endpoint = expandenv("endpoint", &self.endpoint)?;
        self.endpoint = self.endpoint.trim_end_matches('/').to_string();

        self.domain_name = expandenv("domain_name", &self.domain_name)?;
        self.domain_id = expandenv("domain_id", &self.domain_id)?;
        self.username = expandenv("username", &self.username)?;

        self.ca_cert_path = expandenv("ca_cert_path", &self.ca_cert_path)?;
        self.client_cert_path = expandenv("client_cert_path", &self.client_cert_path)?;
        self.client_key_path = expandenv("client_key_path", &self.client_key_path)?;

        Ok(())
    }

    fn default_path() -> Result<PathBuf> {
        let dir = std::env::var_os("HOME") // Unix/Linux/macOS
            .or_else(|| std::env::var_os("USERPROFILE")) // Windows
            .map(PathBuf::from);
        match dir {
            Some(dir) => Ok(dir.join(".config").join(Self::DEFAULT_CONFIG_NAME)),
            None => {
                bail!("could not determine home directory, please specify config path manually")
            }
        }
    }

    fn default_timeout_secs() -> u64 {
        30
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let password = if self.password.is_empty() { "" } else { "******" };
        f.debug_struct("Options")
            .field("endpoint", &self.endpoint)
            .field("domain_name", &self.domain_name)
            .field("domain_id", &self.domain_id)
            .field("username", &self.username)
            .field("password", &password)
            .field("ca_cert_path", &self.ca_cert_path)
            .field("client_cert_path", &self.client_cert_path)
            .field("client_key_path", &self.client_key_path)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// See: [`shellexpand::full`].
pub fn expandenv(name: &str, s: impl AsRef<str>) -> Result<String> {
    let s =
        shellexpand::full(s.as_ref()).with_context(|| format!("expand env value for '{name}'"))?;
    Ok(s.to_string())
}
