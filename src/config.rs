use std::path::PathBuf;

// Default TLS material filenames, resolved under $UPDATER_HOME.
pub const DEFAULT_TLS_CA_CERT: &str = "ca.pem";
pub const DEFAULT_TLS_CERT: &str = "cert.pem";
pub const DEFAULT_TLS_KEY: &str = "key.pem";

pub struct Config {
    pub host: String,
    pub tls: Option<TlsConfig>,
}

pub struct TlsConfig {
    pub ca_cert: PathBuf,
    pub cert: PathBuf,
    pub key: PathBuf,
    pub verify: bool,
}
