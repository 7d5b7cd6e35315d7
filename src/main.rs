use clap::{Parser, Subcommand};
use density_map::{pipeline, AppConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the population density map (the default)
    Render {
        /// TOML overrides; built-in defaults when omitted
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Print the classified department table
    Table {
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Render { config: None }) {
        Commands::Render { config } => {
            let app_config = AppConfig::load_or_default(config.as_deref())?;
            let report = pipeline::run(&app_config)?;

            println!(
                "Wrote {:?} ({}x{}): {} of {} shapes matched",
                report.output, report.width, report.height, report.matched, report.polygons
            );
            if !report.unmatched.is_empty() {
                println!("Unmatched shape names: {}", report.unmatched.join(", "));
            }
        }
        Commands::Table { config } => {
            let app_config = AppConfig::load_or_default(config.as_deref())?;
            let (bins, rows) = pipeline::classify_table(&app_config)?;
            print!("{}", pipeline::format_table(&rows, &bins));
        }
    }

    Ok(())
}
