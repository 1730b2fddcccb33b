use clap::{Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use guardian_mcp_runtime::client::{DEFAULT_AUTH_HEADER, DEFAULT_BASE_URL};
use guardian_mcp_runtime::{ConnectionSettings, McpCommands, run as run_mcp};

#[derive(Parser)]
#[command(
    name = "guardian-mcp",
    version,
    about = "Guardian Intel MCP server — threat intelligence lookups as MCP tools over stdio"
)]
struct Cli {
    /// Guardian Intel API base URL
    #[arg(long, env = "GUARDIAN_INTEL_API_URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,

    /// Guardian Intel API key
    #[arg(long, env = "GUARDIAN_INTEL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Header that carries the API key
    #[arg(long, env = "GUARDIAN_INTEL_AUTH_HEADER", default_value = DEFAULT_AUTH_HEADER)]
    auth_header: String,

    /// Log output format (logs always go to stderr)
    #[arg(long, env = "GUARDIAN_MCP_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: McpCommands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "guardian_mcp=info,guardian_mcp_runtime=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    // stdout carries the protocol stream.
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_format);
    tracing::info!(
        api_url = %cli.api_url,
        auth_header = %cli.auth_header,
        api_key_configured = cli.api_key.as_deref().is_some_and(|key| !key.trim().is_empty()),
        "guardian-mcp starting"
    );

    let settings = ConnectionSettings {
        api_url: cli.api_url,
        api_key: cli.api_key,
        auth_header: cli.auth_header,
    };

    let code = run_mcp(settings, cli.command).await;
    std::process::exit(code);
}
