use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tm2bd::commands::sync::SyncOptions;
use tm2bd::output::Format;

#[derive(Parser)]
#[command(
    name = "tm2bd",
    version = tm2bd::build_info::LONG_VERSION,
    about = "Migrate Task Master tasks into a beads issue tracker"
)]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "json")]
    format: Format,
    /// Shorthand for --format pretty
    #[arg(long, global = true, hide = true)]
    pretty: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create epics, child issues, dependencies and statuses from a tasks file
    Sync {
        /// Task Master tasks.json
        #[arg(long, short)]
        input: PathBuf,
        /// Destination project directory (where `bd` runs)
        #[arg(long, short)]
        project: PathBuf,
        /// Print the planned tracker operations without running them
        #[arg(long)]
        dry_run: bool,
        /// Discard an existing mapping file and migrate from scratch
        #[arg(long, conflicts_with = "resume")]
        force: bool,
        /// Continue from an existing mapping file, skipping mapped entries
        #[arg(long, conflicts_with = "force")]
        resume: bool,
        /// Mapping file path [default: <project>/.beads/taskmaster-mapping.json]
        #[arg(long)]
        mapping: Option<PathBuf>,
        /// Log per-entity operations to stderr
        #[arg(long, short)]
        verbose: bool,
    },
}

fn run(cli: Cli, format: Format) -> tm2bd::error::Result<()> {
    match cli.command {
        Commands::Sync {
            input,
            project,
            dry_run,
            force,
            resume,
            mapping,
            verbose,
        } => {
            tm2bd::logging::init(verbose);
            let opts = SyncOptions {
                input,
                project,
                dry_run,
                force,
                resume,
                mapping,
            };
            tm2bd::commands::sync::run(&opts, format)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let format = if cli.pretty {
        Format::Pretty
    } else {
        cli.format
    };
    if let Err(e) = run(cli, format) {
        match format {
            Format::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "error": e.code(),
                        "message": e.to_string()
                    })
                );
            }
            _ => eprintln!("error: {e}"),
        }
        std::process::exit(1);
    }
}
