use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod cli;
pub use cli::Cli;

fn init_tracing(verbose: bool) {
    let default = if verbose { "docker_remote=debug" } else { "docker_remote=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();
    init_tracing(args.verbose);

    match cli::run(args).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            for (level, cause) in err.chain().skip(1).enumerate() {
                eprintln!("{:indent$}Caused by: {}", "", cause, indent = (level + 1) * 2);
            }
            ExitCode::FAILURE
        }
    }
}
