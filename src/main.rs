mod out;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use playcalls::models::ReportSummary;
use playcalls::transport::HttpClient;
#[cfg(unix)]
use playcalls::transport::{UnixDialer, WithTimeout};
use playcalls::{JsRuntime, Player, Report};

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Coloured step lines with handler output
    #[default]
    Text,
    /// One JSON summary per recipe
    Json,
}

/// Play .http recipes and run their response handler tests
#[derive(Parser)]
#[command(name = "playcalls")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Recipe files, played in order
    #[arg(required = true)]
    recipes: Vec<PathBuf>,

    /// Send every request over this Unix socket
    #[arg(long, env = "PLAYCALLS_UNIX_SOCKET")]
    unix_socket: Option<PathBuf>,

    /// Give up connecting after this many milliseconds
    #[arg(long, env = "PLAYCALLS_CONNECT_TIMEOUT_MS")]
    connect_timeout_ms: Option<u64>,

    /// Loop iteration ceiling for response handlers
    #[arg(long, env = "PLAYCALLS_LOOP_LIMIT", default_value_t = JsRuntime::DEFAULT_LOOP_ITERATION_LIMIT)]
    loop_limit: u64,

    /// Report format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn configure(&self, player: Player) -> anyhow::Result<Player> {
        let timeout = self.connect_timeout_ms.map(Duration::from_millis);
        let player = player.with_runtime(JsRuntime::new().with_loop_iteration_limit(self.loop_limit));
        Ok(match (&self.unix_socket, timeout) {
            #[cfg(unix)]
            (Some(path), Some(timeout)) => player.with_dialer(WithTimeout::new(UnixDialer::new(path), timeout)),
            #[cfg(unix)]
            (Some(path), None) => player.with_dialer(UnixDialer::new(path)),
            #[cfg(not(unix))]
            (Some(_), _) => anyhow::bail!("--unix-socket is only supported on unix"),
            (None, Some(timeout)) => {
                player.with_transport(HttpClient::with_connect_timeout(timeout)?)
            }
            (None, None) => player,
        })
    }
}

fn render(
    format: OutputFormat,
    recipe: &str,
    report: &Report,
    error: Option<String>,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            out::print_report(recipe, report);
            if let Some(error) = error {
                out::error(recipe, &error);
            }
        }
        OutputFormat::Json => {
            let summary = ReportSummary::new(recipe, report, error);
            println!("{}", summary.to_json()?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut all_passed = true;
    for path in &cli.recipes {
        let recipe = path.display().to_string();
        let player = match Player::parse_file(path) {
            Ok(player) => cli.configure(player)?,
            Err(err) => {
                out::error(&recipe, &err.to_string());
                all_passed = false;
                continue;
            }
        };
        if matches!(cli.format, OutputFormat::Text) {
            out::info(&recipe, &format!("playing {} step(s)", player.steps().len()));
        }
        match player.play().await {
            Ok(report) => {
                all_passed &= report.passed();
                render(cli.format, &recipe, &report, None)?;
            }
            Err(aborted) => {
                all_passed = false;
                render(cli.format, &recipe, &aborted.report, Some(aborted.error.to_string()))?;
            }
        }
    }

    if !all_passed {
        std::process::exit(1);
    }
    Ok(())
}
