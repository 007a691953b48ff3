//! Relay server for the QB Tech Solutions chat widget.
//!
//! Serves the widget bundle and proxies chat traffic to the upstream model
//! API so the API credential never reaches the browser.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default address with a credential from the environment
//! QBCHAT_API_KEY=sk-... qbchat-server
//!
//! # Read credentials from a file and bind elsewhere
//! qbchat-server --credentials /etc/qbchat.env --host 127.0.0.1 --port 8080
//!
//! # Override the model and system prompt
//! qbchat-server --model claude-haiku-4-5 --system "Answer in French."
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use arrrg::CommandLine;
use arrrg_derive::CommandLine;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qbchat::upstream::{ModelBackend, ModelClient};
use qbchat::{RelayConfig, RelayState, router};

/// Command-line arguments for the relay server.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
struct ServerArgs {
    /// Host to bind.
    #[arrrg(optional, "Host to bind (default: 0.0.0.0)", "HOST")]
    host: Option<String>,

    /// Port to bind.
    #[arrrg(optional, "Port to bind (default: 3000)", "PORT")]
    port: Option<u16>,

    /// Credential file with KEY=VALUE lines.
    #[arrrg(optional, "Credential file with KEY=VALUE lines", "PATH")]
    credentials: Option<String>,

    /// Directory served for the widget bundle.
    #[arrrg(optional, "Static asset directory (default: static)", "DIR")]
    static_dir: Option<String>,

    /// Model to use for chat and suggestions.
    #[arrrg(optional, "Model to use for chat and suggestions", "MODEL")]
    model: Option<String>,

    /// System prompt override.
    #[arrrg(optional, "System prompt override", "PROMPT")]
    system: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qbchat=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (args, _) = ServerArgs::from_command_line_relaxed("qbchat-server [OPTIONS]");

    let credentials = args.credentials.as_deref().map(PathBuf::from);
    let mut config = RelayConfig::load(credentials.as_deref())?;
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(system) = args.system {
        config.system_prompt = system;
    }
    if let Some(dir) = args.static_dir {
        config.static_dir = PathBuf::from(dir);
    }
    let host = args.host.unwrap_or_else(|| "0.0.0.0".to_string());
    let port = args.port.unwrap_or(3000);
    config.bind_addr = format!("{host}:{port}");

    let backend: Option<Arc<dyn ModelBackend>> = match &config.api_key {
        Some(api_key) => {
            let client = ModelClient::new(
                api_key.clone(),
                config.base_url.clone(),
                config.upstream_timeout,
            )?;
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!(
                "no API credential configured; chat requests will be rejected \
                 (set QBCHAT_API_KEY or pass --credentials)"
            );
            None
        }
    };

    let bind_addr = config.bind_addr.clone();
    let app = router(RelayState::new(backend, config));
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("qbchat relay listening on {bind_addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
