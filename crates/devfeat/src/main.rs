use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let parsed = cli::Cli::parse();

    // Dispatch to CLI handler and handle special exit codes
    match parsed.dispatch().await {
        Ok(()) => Ok(()),
        Err(err) => {
            // Failed scenarios were already reported on stdout
            if let Some(failures) = err.downcast_ref::<commands::test::ScenarioFailures>() {
                eprintln!("{}", console::style(failures).for_stderr().red().bold());
                std::process::exit(1);
            }

            Err(err)
        }
    }
}
