use crate::demo::{run_demo, run_screen, DemoArgs, ScreenArgs};
use crate::server;
use admissions_ai::error::AppError;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Admissions Screening Service",
    about = "Tier, filter and rank university programs for admissions consulting",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Screen a catalog for one student and print the report
    Screen(ScreenArgs),
    /// Walk through every screening stage on a built-in sample catalog
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the configured program catalog CSV
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Override the configured score band JSON
    #[arg(long)]
    pub(crate) score_bands: Option<PathBuf>,
    /// Override the configured expert notes file
    #[arg(long)]
    pub(crate) expert_notes: Option<PathBuf>,
    /// Override the configured per-university summary CSV
    #[arg(long)]
    pub(crate) university_summaries: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Screen(args) => run_screen(args),
        Command::Demo(args) => run_demo(args),
    }
}
