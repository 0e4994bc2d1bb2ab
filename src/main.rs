mod actions;
mod config;
mod error;
mod pip;
mod selector;
mod traits;
mod types;
mod utils;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use config::{MirrorConfig, Settings};
use pip::PipBackend;
use selector::{Selector, Unset};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use types::Mirror;

#[derive(Parser)]
#[command(name = "pymirror")]
#[command(about = "Benchmark PyPI mirrors and install packages through the fastest one", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Python interpreter used to run pip
    #[arg(long, global = true, env = "PYMIRROR_PYTHON")]
    python: Option<String>,

    /// Seconds before a single mirror probe is abandoned
    #[arg(long, global = true, env = "PYMIRROR_TIMEOUT", default_value_t = config::DEFAULT_PROBE_TIMEOUT_SECS)]
    timeout: u64,

    /// Config file holding the default mirror
    #[arg(long, global = true, env = "PYMIRROR_CONFIG")]
    config: Option<PathBuf>,

    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Benchmark every mirror and print the ranking
    Test,
    /// List the known mirrors
    List,
    /// Install packages through a mirror (e.g., pymirror install requests -m Aliyun)
    Install {
        #[arg(required = true)]
        packages: Vec<String>,

        /// Mirror name. Defaults to the saved default, then the fastest mirror
        #[arg(long, short)]
        mirror: Option<String>,

        /// Upgrade packages that are already installed
        #[arg(long, short)]
        upgrade: bool,
    },
    /// Upgrade every outdated package
    UpdateAll {
        #[arg(long, short)]
        mirror: Option<String>,
    },
    /// Save the default mirror (the fastest one if --mirror is omitted)
    SetDefault {
        #[arg(long, short)]
        mirror: Option<String>,

        /// Use this URL instead of the built-in one for --mirror
        #[arg(long, requires = "mirror")]
        url: Option<String>,
    },
    /// Forget the saved default mirror
    UnsetDefault,
    /// Show the saved default mirror
    ShowDefault,
    /// Show where installed packages live (e.g., pymirror locate numpy)
    Locate { packages: Vec<String> },
    /// Run `pip list`
    Packages,
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let settings = Settings {
        python: cli.python.unwrap_or_else(|| config::default_python().to_string()),
        probe_timeout: Duration::from_secs(cli.timeout.max(1)),
        config_path: cli.config.unwrap_or_else(config::default_config_path),
    };
    let catalog = config::load_catalog()?;
    let backend = PipBackend::new(&settings.python);

    match command {
        Commands::Test => handle_test(&backend, &catalog, &settings).await?,
        Commands::List => handle_list(&catalog),
        Commands::Install {
            packages,
            mirror,
            upgrade,
        } => {
            let mut cfg = MirrorConfig::load(&settings.config_path).await;
            let selector = Selector::new(&catalog, &backend, settings.probe_timeout, &mut cfg, &settings.config_path);
            let target = selector.resolve(mirror.as_deref()).await?;
            actions::install(&backend, &packages, &target, upgrade).await?;
        }
        Commands::UpdateAll { mirror } => {
            let mut cfg = MirrorConfig::load(&settings.config_path).await;
            let selector = Selector::new(&catalog, &backend, settings.probe_timeout, &mut cfg, &settings.config_path);
            let target = selector.resolve(mirror.as_deref()).await?;
            actions::update_all(&backend, &target).await?;
        }
        Commands::SetDefault { mirror, url } => {
            let mut cfg = MirrorConfig::load(&settings.config_path).await;
            let mut selector =
                Selector::new(&catalog, &backend, settings.probe_timeout, &mut cfg, &settings.config_path);
            let chosen = selector.set_default(mirror.as_deref(), url.as_deref()).await?;
            println!("Default mirror set to {} ({}).", chosen.name, chosen.url);
        }
        Commands::UnsetDefault => {
            let mut cfg = MirrorConfig::load(&settings.config_path).await;
            let mut selector =
                Selector::new(&catalog, &backend, settings.probe_timeout, &mut cfg, &settings.config_path);
            match selector.unset_default().await {
                Unset::Removed(m) => println!("Default mirror {} removed.", m.name),
                Unset::NothingSet => println!("No default mirror was set."),
            }
        }
        Commands::ShowDefault => {
            let mut cfg = MirrorConfig::load(&settings.config_path).await;
            let selector = Selector::new(&catalog, &backend, settings.probe_timeout, &mut cfg, &settings.config_path);
            match selector.show_default() {
                Some(m) => println!("Default mirror: {} ({})", m.name, m.url),
                None => println!("No default mirror set."),
            }
        }
        Commands::Locate { packages } => {
            let packages = if packages.is_empty() {
                actions::DEFAULT_LOCATE_PACKAGES.iter().map(|s| s.to_string()).collect()
            } else {
                packages
            };
            actions::locate(&backend, &packages).await?;
        }
        Commands::Packages => actions::list_all(&backend).await?,
    }

    Ok(())
}

// --- Handlers ---

fn handle_list(catalog: &[Mirror]) {
    println!("{}", "-".repeat(70));
    println!("{:<4} {:<12} URL", "#", "NAME");
    println!("{}", "-".repeat(70));
    for (i, m) in catalog.iter().enumerate() {
        println!("{:<4} {:<12} {}", i + 1, m.name, m.url);
    }
    println!("{}", "-".repeat(70));
}

async fn handle_test(backend: &PipBackend, catalog: &[Mirror], settings: &Settings) -> Result<()> {
    println!("Testing {} mirrors...", catalog.len());
    let results = utils::probe_all(backend, catalog, settings.probe_timeout).await;

    println!();
    println!(
        "{:<4} {:<12} {:<58} {:<8} STATUS",
        "RANK", "NAME", "URL", "SECONDS"
    );
    println!("{}", "-".repeat(100));

    for (i, res) in results.iter().enumerate() {
        let (secs, status) = if res.success {
            (format!("{:.2}", res.latency_secs), "available")
        } else {
            ("N/A".to_string(), "unavailable")
        };
        println!(
            "{:<4} {:<12} {:<58} {:<8} {}",
            i + 1,
            res.mirror.name,
            res.mirror.url,
            secs,
            status
        );
    }
    println!("{}", "-".repeat(100));

    match results.iter().find(|r| r.success) {
        Some(best) => {
            println!("Fastest mirror: {} ({})", best.mirror.name, best.mirror.url);
            println!("Run 'pymirror set-default --mirror {}' to make it the default.", best.mirror.name);
        }
        None => println!("No mirror is reachable. Please check your network connection."),
    }

    Ok(())
}
