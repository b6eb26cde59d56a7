use colored::Colorize;
use std::process;

#[tokio::main]
async fn main() {
    cmdx::logging::init_logging();

    match cmdx::cli::run().await {
        Ok(()) => {}
        Err(cmdx::CmdxError::Cli(e)) => e.exit(),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            process::exit(e.exit_code());
        }
    }
}
