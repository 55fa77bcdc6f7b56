//! Client configuration

use crate::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Regional endpoint override.
///
/// Private deployments use this to point every manager at their own hosts.
/// Hosts may be given bare (`up.example.com`) or with a scheme
/// (`http://10.0.0.1:9000`); bare hosts get the scheme selected by
/// [`Config::use_https`].
///
/// The `config` crate lowercases keys, hence the lowercase aliases.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneConf {
    /// Upload hosts on the origin
    #[serde(rename = "srcUpHosts", alias = "srcuphosts", alias = "src_up_hosts", default)]
    pub src_up_hosts: Vec<String>,
    /// Upload hosts behind the CDN
    #[serde(rename = "cdnUpHosts", alias = "cdnuphosts", alias = "cdn_up_hosts", default)]
    pub cdn_up_hosts: Vec<String>,
    /// Resource management host (stat)
    #[serde(rename = "rsHost", alias = "rshost", alias = "rs_host", default)]
    pub rs_host: String,
    /// Resource listing host
    #[serde(rename = "rsfHost", alias = "rsfhost", alias = "rsf_host", default)]
    pub rsf_host: String,
    /// API host (persistent operations)
    #[serde(rename = "apiHost", alias = "apihost", alias = "api_host", default)]
    pub api_host: String,
    /// IO host
    #[serde(rename = "ioVipHost", alias = "ioviphost", alias = "io_vip_host", default)]
    pub io_vip_host: String,
}

impl ZoneConf {
    /// The public default region
    pub fn public_default() -> Self {
        Self {
            src_up_hosts: vec![
                "up.qiniup.com".to_string(),
                "up-nb.qiniup.com".to_string(),
                "up-xs.qiniup.com".to_string(),
            ],
            cdn_up_hosts: vec![
                "upload.qiniup.com".to_string(),
                "upload-nb.qiniup.com".to_string(),
                "upload-xs.qiniup.com".to_string(),
            ],
            rs_host: "rs.qiniu.com".to_string(),
            rsf_host: "rsf.qiniu.com".to_string(),
            api_host: "api.qiniu.com".to_string(),
            io_vip_host: "iovip.qbox.me".to_string(),
        }
    }

    /// Point every host at a single address, e.g. a gateway in a private deployment
    pub fn single_host(host: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            src_up_hosts: vec![host.clone()],
            cdn_up_hosts: vec![host.clone()],
            rs_host: host.clone(),
            rsf_host: host.clone(),
            api_host: host.clone(),
            io_vip_host: host,
        }
    }
}

/// Fully-qualified base URLs for each manager
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    /// Form upload; `None` when the zone lists no upload hosts
    pub up: Option<String>,
    /// Stat
    pub rs: String,
    /// List
    pub rsf: String,
    /// Pfop / prefop
    pub api: String,
    /// IO
    pub io: String,
}

/// Client configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Talk to the backend over TLS
    pub use_https: bool,
    /// Upload through the CDN upload hosts
    pub use_cdn_domains: bool,
    /// Regional endpoint override; `None` selects the public default region
    pub zone: Option<ZoneConf>,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            use_https: false,
            use_cdn_domains: false,
            zone: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("kodo-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Config {
    /// Create a config with the default region
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable TLS
    pub fn with_https(mut self, enabled: bool) -> Self {
        self.use_https = enabled;
        self
    }

    /// Enable or disable the CDN upload hosts
    pub fn with_cdn_domains(mut self, enabled: bool) -> Self {
        self.use_cdn_domains = enabled;
        self
    }

    /// Set a regional endpoint override
    pub fn with_zone(mut self, zone: ZoneConf) -> Self {
        self.zone = Some(zone);
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve the base URL of every manager
    pub fn endpoints(&self) -> Endpoints {
        let default_zone;
        let zone = match &self.zone {
            Some(zone) => zone,
            None => {
                default_zone = ZoneConf::public_default();
                &default_zone
            }
        };

        let up_hosts = if self.use_cdn_domains {
            &zone.cdn_up_hosts
        } else {
            &zone.src_up_hosts
        };

        Endpoints {
            up: up_hosts.first().map(|host| self.endpoint(host)),
            rs: self.endpoint(&zone.rs_host),
            rsf: self.endpoint(&zone.rsf_host),
            api: self.endpoint(&zone.api_host),
            io: self.endpoint(&zone.io_vip_host),
        }
    }

    fn endpoint(&self, host: &str) -> String {
        let host = host.trim_end_matches('/');
        if host.contains("://") {
            host.to_string()
        } else if self.use_https {
            format!("https://{}", host)
        } else {
            format!("http://{}", host)
        }
    }
}

/// Everything needed to build a client, as loaded from a file or the environment
#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub domain: String,
    #[serde(default)]
    pub use_https: bool,
    #[serde(default)]
    pub use_cdn_domains: bool,
    #[serde(default)]
    pub zone: Option<ZoneConf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Settings {
    /// Load settings from a YAML/TOML/JSON file, overridden by `KODO_*` variables
    /// (for example `KODO_SECRET_KEY`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("KODO").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ClientError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load settings from `KODO_*` environment variables only
    pub fn from_env() -> Result<Self> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("KODO").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ClientError::Config(e.to_string()))
    }

    /// The client configuration these settings describe
    pub fn config(&self) -> Config {
        Config {
            use_https: self.use_https,
            use_cdn_domains: self.use_cdn_domains,
            zone: self.zone.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_region_endpoints() {
        let endpoints = Config::default().endpoints();
        assert_eq!(endpoints.up.as_deref(), Some("http://up.qiniup.com"));
        assert_eq!(endpoints.rsf, "http://rsf.qiniu.com");
        assert_eq!(endpoints.api, "http://api.qiniu.com");

        let endpoints = Config::new()
            .with_https(true)
            .with_cdn_domains(true)
            .endpoints();
        assert_eq!(endpoints.up.as_deref(), Some("https://upload.qiniup.com"));
        assert_eq!(endpoints.rs, "https://rs.qiniu.com");
    }

    #[test]
    fn test_zone_hosts_with_scheme_kept() {
        let config = Config::new()
            .with_https(true)
            .with_zone(ZoneConf::single_host("http://127.0.0.1:9000/"));
        let endpoints = config.endpoints();
        assert_eq!(endpoints.up.as_deref(), Some("http://127.0.0.1:9000"));
        assert_eq!(endpoints.io, "http://127.0.0.1:9000");
    }

    #[test]
    fn test_zone_without_upload_hosts() {
        let config = Config::new().with_zone(ZoneConf {
            rs_host: "rs.internal".to_string(),
            ..Default::default()
        });
        let endpoints = config.endpoints();
        assert_eq!(endpoints.up, None);
        assert_eq!(endpoints.rs, "http://rs.internal");
    }

    #[test]
    fn test_zone_conf_camel_case() {
        let json = r#"{
            "srcUpHosts": ["up.internal"],
            "cdnUpHosts": ["cdn.internal"],
            "rsHost": "rs.internal",
            "rsfHost": "rsf.internal",
            "apiHost": "api.internal",
            "ioVipHost": "io.internal"
        }"#;
        let zone: ZoneConf = serde_json::from_str(json).unwrap();
        assert_eq!(zone.src_up_hosts, vec!["up.internal"]);
        assert_eq!(zone.io_vip_host, "io.internal");
    }

    #[test]
    fn test_settings_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
access_key = "ak"
secret_key = "sk"
bucket = "media"
domain = "http://cdn.example.com"
use_https = true

[zone]
src_up_hosts = ["up.internal"]
rs_host = "rs.internal"
"#
        )
        .unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.bucket, "media");
        assert_eq!(settings.timeout_secs, DEFAULT_TIMEOUT_SECS);

        let config = settings.config();
        assert!(config.use_https);
        let endpoints = config.endpoints();
        assert_eq!(endpoints.up.as_deref(), Some("https://up.internal"));
        assert_eq!(endpoints.rs, "https://rs.internal");
    }
}
