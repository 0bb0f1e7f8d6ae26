use admissions_ai::error::AppError;
use clap::{Args, Parser, Subcommand};

use crate::demo::{run_demo, run_report, DemoArgs, ReportArgs};
use crate::server;

#[derive(Parser, Debug)]
#[command(
    name = "Admissions CRM",
    about = "Run and demonstrate the admissions CRM automation service",
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
    /// Print a filtered application report as JSON or CSV
    Report(ReportArgs),
    /// Walk through metrics, reporting and the application lifecycle on sample data
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
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Report(args) => run_report(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
