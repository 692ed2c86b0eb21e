use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

mod drag;
mod errors;
mod events;
mod export;
mod filters;
mod metrics;
mod model;
mod pipeline;
mod store;
mod subscription;
mod ui;

use pipeline::Pipeline;
use store::Store;
use subscription::{AuthContext, Plan, Subscription};

const LOG_FILE: &str = "leadkan.log";

#[derive(Parser)]
#[command(name = "leadkan", version, about = "Sales-pipeline tracker with a terminal Kanban board")]
struct Cli {
    /// Directory holding the board document and log file.
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Subscription tier; the free tier caps the board at 10 leads.
    #[arg(long, value_enum, default_value = "free")]
    plan: Plan,

    /// Signed-in user. Without one the session runs in memory only.
    #[arg(long, default_value = "local")]
    user: String,

    /// Write the monthly CSV report to this path and exit.
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.data_dir)?;

    let store = Store::new(&cli.data_dir);
    let subscription = Subscription::new(cli.plan);
    let auth = AuthContext::signed_in(&cli.user);
    let pipeline = Pipeline::open(store, subscription, auth);

    if let Some(path) = cli.report {
        let rows = metrics::monthly_report(pipeline.leads());
        export::export_report(&rows, &path)?;
        println!("report written to {}", path.display());
        return Ok(());
    }

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = ui::App::new(pipeline, &cli.data_dir);
    let result = ui::run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result?;
    Ok(())
}

/// Logs go to a file so the alternate screen stays clean.
fn init_logging(data_dir: &std::path::Path) -> io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join(LOG_FILE))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(file)
        .with_ansi(false)
        .init();
    Ok(())
}
