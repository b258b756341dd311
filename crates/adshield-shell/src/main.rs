//! AdShield shell entry point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use adshield::{sweep_html, ContentShield};
use adshield_shell::config::{self, ShellConfig};
use adshield_shell::renderer::chromium::ChromiumRenderer;
use adshield_shell::renderer::Renderer;
use adshield_shell::{doctor, repl, NavigationController};

#[derive(Parser)]
#[command(
    name = "adshield-shell",
    about = "AdShield — a browser shell that keeps ads off a streaming site",
    version
)]
struct Cli {
    /// Path to a JSON rules file (defaults to the built-in rules).
    #[arg(long, global = true)]
    rules: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the site in a filtered browser window (default).
    Run {
        /// URL to open.
        #[arg(long)]
        url: Option<String>,

        /// Run without a visible window.
        #[arg(long)]
        headless: bool,

        /// Browser profile directory.
        #[arg(long)]
        profile_dir: Option<String>,

        /// Navigation timeout in milliseconds.
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Classify request URLs against the active rules.
    Check {
        /// URLs to classify.
        #[arg(required = true)]
        urls: Vec<String>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the guard script injected after each navigation.
    Guard,

    /// Remove ad containers from an HTML file and print the result.
    Sweep {
        /// HTML file to sweep.
        file: PathBuf,
    },

    /// Validate and print the active rules.
    Rules,

    /// Check environment and diagnose issues.
    Doctor,

    /// Generate shell completion scripts.
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let command = cli.command.unwrap_or(Commands::Run {
        url: None,
        headless: false,
        profile_dir: None,
        timeout: None,
    });

    let result = dispatch(command, cli.rules.as_deref()).await;

    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }

    result
}

async fn dispatch(command: Commands, rules: Option<&str>) -> Result<()> {
    match command {
        Commands::Run {
            url,
            headless,
            profile_dir,
            timeout,
        } => {
            let config = ShellConfig::resolve(
                url.as_deref(),
                rules,
                profile_dir.as_deref(),
                headless,
                timeout,
            );
            run_shell(config).await
        }

        Commands::Check { urls, json } => {
            let shield = load_shield(rules)?;
            let classifier = shield.interceptor().classifier().clone();
            if json {
                let results: Vec<_> = urls
                    .iter()
                    .map(|url| {
                        serde_json::json!({
                            "url": url,
                            "classification": classifier.classify(url),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for url in &urls {
                    match classifier.classify(url) {
                        adshield::Classification::Allow => println!("ALLOW  {url}"),
                        adshield::Classification::Block { reason } => {
                            println!("BLOCK  {url}  ({reason})")
                        }
                    }
                }
            }
            Ok(())
        }

        Commands::Guard => {
            let shield = load_shield(rules)?;
            println!("{}", shield.injector().script_for_navigation());
            Ok(())
        }

        Commands::Sweep { file } => {
            let shield = load_shield(rules)?;
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let snapshot = shield.store().snapshot();
            let outcome = sweep_html(&html, snapshot.dom_selectors().iter().map(String::as_str));
            tracing::info!(removed = outcome.removed, "sweep complete");
            println!("{}", outcome.html);
            Ok(())
        }

        Commands::Rules => {
            let shield = load_shield(rules)?;
            let document = shield.store().snapshot().to_document();
            println!("{}", serde_json::to_string_pretty(&document)?);
            Ok(())
        }

        Commands::Doctor => {
            let config = ShellConfig::resolve(None, rules, None, false, None);
            if !doctor::run(&config)? {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "adshield-shell", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn load_shield(rules: Option<&str>) -> Result<ContentShield> {
    let path = config::resolve_rules_path(rules);
    ContentShield::load(path.as_deref()).context("failed to load rules")
}

async fn run_shell(config: ShellConfig) -> Result<()> {
    config::ensure_profile_dir(&config.profile_dir).with_context(|| {
        format!(
            "failed to create profile directory {}",
            config.profile_dir.display()
        )
    })?;

    let shield =
        ContentShield::load(config.rules_path.as_deref()).context("failed to load rules")?;
    let renderer = ChromiumRenderer::launch(&config.profile_dir, config.headless).await?;
    let mut controller =
        NavigationController::open(&renderer, shield, config.nav_timeout_ms).await?;

    // A failed first load leaves the window usable; /go retries.
    if let Err(e) = controller.navigate(&config.start_url).await {
        tracing::warn!(url = %config.start_url, "initial navigation failed: {e:#}");
    }

    repl::run(&mut controller, config.rules_path.clone()).await?;

    controller.close().await?;
    renderer.shutdown().await
}
