use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

use pagetour::catalog::TourFile;
use pagetour::config::Config;
use pagetour::error::TourError;
use pagetour::logging;
use pagetour::scheduler::VirtualClock;
use pagetour::selector::Selector;
use pagetour::session::{Action, TourSession};
use pagetour::site::Site;
use pagetour::state::{JsonFileStore, StateStore, TourState};
use pagetour::ui::Preview;

#[derive(Parser)]
#[command(name = "pagetour")]
#[command(about = "Cross-page guided tours for multi-page sites")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a tour interactively in the terminal
    Preview {
        /// Tour definition (toml, yaml or json)
        tour: PathBuf,

        /// Page to open first (defaults to the first step's page)
        #[arg(short, long)]
        page: Option<String>,
    },

    /// Run a tour headlessly and print what happens
    Walk {
        /// Tour definition (toml, yaml or json)
        tour: PathBuf,

        /// Page to open first (defaults to the first step's page)
        #[arg(short, long)]
        page: Option<String>,

        /// Comma-separated actions (start, resume, next, back, skip, cancel,
        /// reload, wait:<ms>); defaults to starting and clicking through
        #[arg(short, long, value_delimiter = ',')]
        actions: Vec<String>,
    },

    /// Validate a tour definition against its pages
    Check {
        /// Tour definition (toml, yaml or json)
        tour: PathBuf,
    },

    /// Show the persisted tour progress
    Status,

    /// Clear the persisted tour progress
    Reset,

    /// Write the effective configuration to .pagetour/config.toml
    Init {
        /// Overwrite an existing project config
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;

    // The preview owns the terminal, so it logs to a file
    let is_preview = matches!(cli.command, Commands::Preview { .. });
    let logging_handle = logging::init_logging(&config, is_preview, cli.debug)?;

    match cli.command {
        Commands::Preview { tour, page } => {
            cmd_preview(&config, &tour, page.as_deref())?;
            if let Some(log_path) = logging_handle.log_file_path {
                if log_path.metadata().map(|m| m.len() > 0).unwrap_or(false) {
                    eprintln!("Session log: {}", log_path.display());
                }
            }
        }
        Commands::Walk {
            tour,
            page,
            actions,
        } => {
            cmd_walk(&config, &tour, page.as_deref(), &actions)?;
        }
        Commands::Check { tour } => {
            cmd_check(&config, &tour)?;
        }
        Commands::Status => {
            cmd_status(&config);
        }
        Commands::Reset => {
            cmd_reset(&config);
        }
        Commands::Init { force } => {
            cmd_init(&config, &Config::project_config_path(), force)?;
        }
    }

    Ok(())
}

fn state_store(config: &Config) -> JsonFileStore {
    JsonFileStore::new(config.state_path(), config.tour.state_key.clone())
}

fn load_tour(path: &Path) -> Result<TourFile> {
    let tour = TourFile::load(path)
        .with_context(|| format!("Failed to load tour from {}", path.display()))?;
    if tour.steps.is_empty() {
        return Err(TourError::EmptyCatalog.into());
    }
    Ok(tour)
}

fn cmd_preview(config: &Config, path: &Path, page: Option<&str>) -> Result<()> {
    let tour = load_tour(path)?;
    let session = TourSession::open(&tour, config, state_store(config), page)?;
    let tick = Duration::from_millis(config.preview.tick_ms.max(1));

    let mut preview = Preview::new(session, tick);
    preview.run()
}

fn cmd_walk(config: &Config, path: &Path, page: Option<&str>, actions: &[String]) -> Result<()> {
    let tour = load_tour(path)?;
    let actions = if actions.is_empty() {
        // start, then one click per step finishes the tour
        std::iter::once(Action::Start)
            .chain(std::iter::repeat(Action::Next).take(tour.steps.len()))
            .collect()
    } else {
        actions
            .iter()
            .map(|a| a.parse::<Action>().map_err(anyhow::Error::msg))
            .collect::<Result<Vec<_>>>()?
    };

    let mut session = TourSession::open(&tour, config, state_store(config), page)?;
    session.settle();
    for action in actions {
        session.apply(action);
        session.settle();
    }

    for event in session.events() {
        println!("{event}");
    }
    println!("{}", "─".repeat(60));
    print_state(&session.store().read());
    Ok(())
}

fn cmd_check(config: &Config, path: &Path) -> Result<()> {
    let tour = load_tour(path)?;
    let site = Site::new(tour.pages.clone());
    let budget = config.tour.retry_interval() * config.tour.max_resolve_attempts;
    let mut problems = 0;

    println!("Tour: {} ({} steps)", path.display(), tour.steps.len());
    println!("{}", "─".repeat(60));

    for (index, step) in tour.steps.iter().enumerate() {
        let mut notes = Vec::new();
        let page_known = site.has_page(&step.page);
        if !page_known {
            notes.push(TourError::UnknownPage(step.page.clone()).to_string());
        }

        if let Some(selector) = step.selector() {
            match Selector::parse(selector) {
                Err(source) => {
                    problems += 1;
                    let err = TourError::Selector {
                        selector: selector.to_string(),
                        source,
                    };
                    notes.push(err.to_string());
                }
                Ok(parsed) if page_known => {
                    match appears_within(&site, &step.page, &parsed, budget) {
                        Some(at) if at.is_zero() => {}
                        Some(at) => notes.push(format!("target appears after {}ms", at.as_millis())),
                        None => {
                            problems += 1;
                            notes.push(format!(
                                "target '{selector}' missing (popover will show unanchored)"
                            ));
                        }
                    }
                }
                Ok(_) => {}
            }
        }

        let status = if notes.is_empty() {
            "ok".to_string()
        } else {
            notes.join("; ")
        };
        println!(
            "{:>3}. {:<20} {:<24} {}",
            index + 1,
            step.page,
            step.display_title(),
            status
        );
    }

    if problems > 0 {
        anyhow::bail!("{problems} problem(s) found");
    }
    Ok(())
}

/// Time after load at which `selector` first matches on `page`, if within `budget`
fn appears_within(site: &Site, page: &str, selector: &Selector, budget: Duration) -> Option<Duration> {
    let clock = VirtualClock::new();
    let document = site.load(page, clock.clone());
    let mut elapsed = Duration::ZERO;
    loop {
        if document.query(selector).is_some() {
            return Some(elapsed);
        }
        // Content only changes when an element's delay elapses
        let next = document
            .nodes()
            .map(|node| node.ready_at)
            .filter(|ready| *ready > elapsed)
            .min()?;
        if next > budget {
            return None;
        }
        clock.advance(next - elapsed);
        elapsed = next;
    }
}

fn cmd_status(config: &Config) {
    let store = state_store(config);
    println!("State file: {}", store.path().display());
    print_state(&store.read());
}

fn print_state(state: &TourState) {
    if state.active {
        println!("Tour active at step {}", state.step + 1);
    } else {
        println!("No tour in progress");
    }
}

fn cmd_reset(config: &Config) {
    let mut store = state_store(config);
    store.write(TourState::inactive());
    println!("Tour progress cleared");
}

fn cmd_init(config: &Config, path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    config.save_to(path)?;
    tracing::info!(path = %path.display(), "Wrote project config");
    println!("Wrote {}", path.display());
    Ok(())
}
