// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use case_docket::config::{init_tracing, StoreArgs};
use case_docket::service::DocketService;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "case-docket", version, about = "Document stage board for case files")]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create (or migrate) the database
    Init,
    /// List cases with their ids
    Cases,
    /// List document stages in display order
    Stages,
    /// Open the terminal document board of a case
    Board {
        #[arg(long = "case")]
        case_id: String,
    },
    /// Write a case's document timeline as CSV
    Export {
        #[arg(long = "case")]
        case_id: String,
        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // The board owns the terminal; everything else logs to stderr
    if !matches!(cli.command, Command::Board { .. }) {
        init_tracing(&cli.store.log_level);
    }

    let service = DocketService::open(&cli.store.db)
        .with_context(|| format!("opening {}", cli.store.db.display()))?;

    match cli.command {
        Command::Init => {
            println!("🗄️  Docket database ready: {}", cli.store.db.display());
            println!("✓ {} case(s), {} stage(s)", service.list_cases()?.len(), service.list_stages()?.len());
        }
        Command::Cases => {
            for case in service.list_cases()? {
                println!(
                    "{}  {}{}",
                    case.id,
                    case.title,
                    case.case_number.map(|n| format!("  #{}", n)).unwrap_or_default()
                );
            }
        }
        Command::Stages => {
            let stages = service.list_stages()?;
            if stages.is_empty() {
                println!("No stages yet");
            }
            for stage in stages {
                println!("{:>3}  {}  {}", stage.order, stage.name, stage.id);
            }
        }
        Command::Board { case_id } => run_board(service, &cli.store, &case_id)?,
        Command::Export { case_id, out } => {
            let rows = match &out {
                Some(path) => {
                    let file = File::create(path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    service.export_timeline(&case_id, BufWriter::new(file))?
                }
                None => {
                    let stdout = io::stdout();
                    let mut lock = stdout.lock();
                    let rows = service.export_timeline(&case_id, &mut lock)?;
                    lock.flush()?;
                    rows
                }
            };
            if let Some(path) = out {
                eprintln!("✓ {} document(s) written to {}", rows, path.display());
            }
        }
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_board(service: DocketService, store: &StoreArgs, case_id: &str) -> Result<()> {
    let log_path = store.db.with_extension("log");
    case_docket::config::init_file_tracing(&store.log_level, &log_path)?;

    let session = case_docket::session::Session::operator();
    let mut app = ui::App::new(service, session, case_id)?;
    ui::run_ui(&mut app)
}

#[cfg(not(feature = "tui"))]
fn run_board(_service: DocketService, _store: &StoreArgs, _case_id: &str) -> Result<()> {
    anyhow::bail!("terminal board not available, rebuild with `--features tui` or use docket-server")
}
