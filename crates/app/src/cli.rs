//! Command-line parsing for the console.
//!
//! Flags take precedence over `MAP_QUERY_API_URL` / `MAP_QUERY_TIMEOUT_MS`,
//! which in turn override the built-in defaults.

use std::{net::IpAddr, time::Duration};

use anyhow::{Result, anyhow, bail};
use clap::Parser;
use map_query::{ClientConfig, OrchestratorConfig};

const MAX_FIT_PADDING_PX: u32 = 1_000;

/// Browser console for nearest-neighbor, range, and intersection queries.
#[derive(Debug, Parser)]
#[command(name = "map-console", version)]
pub(crate) struct ConsoleCliArgs {
    /// Base URL of the spatial-index service, e.g. http://localhost:3000/api.
    #[arg(long = "api-url", value_name = "URL")]
    pub(crate) api_url: Option<String>,
    /// Abort backend requests after this many milliseconds (default: wait forever).
    #[arg(long = "timeout-ms", value_name = "MS")]
    pub(crate) timeout_ms: Option<u64>,
    /// Address the console listens on.
    #[arg(long = "bind", value_name = "ADDR", default_value = "127.0.0.1")]
    pub(crate) bind: String,
    /// Port the console listens on.
    #[arg(long = "port", value_name = "PORT", default_value_t = 8080)]
    pub(crate) port: u16,
    /// Padding in pixels around fitted viewports.
    #[arg(long = "fit-padding", value_name = "PX")]
    pub(crate) fit_padding: Option<u32>,
    /// Tracing filter directive, overrides RUST_LOG (e.g. "map_query=debug").
    #[arg(long = "log-filter", value_name = "FILTER")]
    pub(crate) log_filter: Option<String>,
}

/// Fully validated settings for one console run.
#[derive(Clone, Debug)]
pub(crate) struct ConsoleConfig {
    pub(crate) client: ClientConfig,
    pub(crate) orchestrator: OrchestratorConfig,
    pub(crate) bind: IpAddr,
    pub(crate) port: u16,
}

impl TryFrom<ConsoleCliArgs> for ConsoleConfig {
    type Error = anyhow::Error;

    fn try_from(args: ConsoleCliArgs) -> Result<Self> {
        let env = ClientConfig::from_env();

        let base_url = match args.api_url {
            Some(url) if url.trim().is_empty() => bail!("--api-url must not be empty"),
            Some(url) => url,
            None => env.base_url,
        };
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            bail!("--api-url must start with http:// or https://, got {base_url:?}");
        }

        let request_timeout = match args.timeout_ms {
            Some(0) => bail!("--timeout-ms must be greater than zero"),
            Some(ms) => Some(Duration::from_millis(ms)),
            None => env.request_timeout,
        };

        let fit_padding_px = args
            .fit_padding
            .unwrap_or(OrchestratorConfig::default().fit_padding_px);
        if fit_padding_px > MAX_FIT_PADDING_PX {
            bail!("--fit-padding must be at most {MAX_FIT_PADDING_PX}");
        }

        if args.port == 0 {
            bail!("--port must be non-zero");
        }
        let bind = args
            .bind
            .parse::<IpAddr>()
            .map_err(|err| anyhow!("--bind {:?} is not an IP address: {err}", args.bind))?;

        Ok(Self {
            client: ClientConfig::new(base_url).with_timeout(request_timeout),
            orchestrator: OrchestratorConfig { fit_padding_px },
            bind,
            port: args.port,
        })
    }
}
