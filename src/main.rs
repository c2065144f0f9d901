use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use config_updater::client::HttpReleaseService;
use config_updater::command::UpdateCommand;
use config_updater::config::{
    Config, TlsConfig, DEFAULT_TLS_CA_CERT, DEFAULT_TLS_CERT, DEFAULT_TLS_KEY,
};

/// Update config values or templates of an existing release.
#[derive(Parser)]
#[command(name = "config-updater")]
struct Cli {
    /// Name of the release to update
    release: String,

    /// Values files applied in order, later files win ("-" reads standard input)
    #[arg(short = 'f', long = "values", value_delimiter = ',')]
    value_files: Vec<String>,

    /// Set values on the command line, applied after all values files
    /// (can specify multiple or separate values with commas: key1=val1,key2=val2)
    #[arg(long = "set-value", value_delimiter = ',')]
    set_values: Vec<String>,

    /// Set the desired number of templates for a family (e.g. diego-cell=2)
    #[arg(long = "set-template", value_delimiter = ',')]
    set_templates: Vec<String>,

    /// Reset the values to the ones built into the chart instead of reusing
    /// the stored ones
    #[arg(long)]
    reset_values: bool,

    /// Host and port of the release manager, defaults to $RELEASE_HOST
    #[arg(long)]
    host: Option<String>,

    /// Talk to the release manager over TLS
    #[arg(long)]
    tls: bool,

    /// Verify the certificate presented by the release manager
    #[arg(long)]
    tls_verify: bool,

    /// Path to a TLS CA certificate file, defaults to $UPDATER_HOME/ca.pem
    #[arg(long)]
    tls_ca_cert: Option<PathBuf>,

    /// Path to a TLS client certificate file, defaults to $UPDATER_HOME/cert.pem
    #[arg(long)]
    tls_cert: Option<PathBuf>,

    /// Path to a TLS client key file, defaults to $UPDATER_HOME/key.pem
    #[arg(long)]
    tls_key: Option<PathBuf>,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let cli = Cli::parse();

    let host = match cli.host {
        Some(host) => host,
        None => std::env::var("RELEASE_HOST").context("RELEASE_HOST")?,
    };
    let home = std::env::var("UPDATER_HOME").unwrap_or_else(|_| ".".to_string());
    let tls = cli.tls.then(|| TlsConfig {
        ca_cert: cli
            .tls_ca_cert
            .unwrap_or_else(|| Path::new(&home).join(DEFAULT_TLS_CA_CERT)),
        cert: cli
            .tls_cert
            .unwrap_or_else(|| Path::new(&home).join(DEFAULT_TLS_CERT)),
        key: cli
            .tls_key
            .unwrap_or_else(|| Path::new(&home).join(DEFAULT_TLS_KEY)),
        verify: cli.tls_verify,
    });

    let config = Config { host, tls };
    let client = HttpReleaseService::new(&config)?;

    let update = UpdateCommand {
        release: cli.release,
        value_files: cli.value_files,
        set_values: cli.set_values,
        template_counts: cli.set_templates,
        reset_values: cli.reset_values,
    };
    update.run(&client)?;

    log::info!("update successful");
    Ok(())
}
