use clap::Parser;
use std::process::ExitCode;
use sweeper::app;
use sweeper::args::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match app::run(cli).await {
        Ok(status) => status.into(),
        Err(e) => {
            log::error!("{e}");
            eprintln!("Error: {e}");
            e.status().into()
        }
    }
}
