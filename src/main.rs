use codemod::config::{Command, Config, Options};
use codemod::runner::Runner;
use codemod::Host;
use tracing::{debug, error, trace};

#[tokio::main]
async fn main() {
    let command = match Options::from_env().parse() {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(2);
        }
    };

    let config = match command {
        Command::Help(text) => {
            print!("{text}");
            return;
        }
        Command::Version(text) => {
            print!("{text}");
            return;
        }
        Command::Run(config) => *config,
    };

    let log_level = match config.verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // Logs go to stderr so --stdio output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .with_target(config.verbosity >= 2)
        .with_line_number(config.verbosity >= 3)
        .init();

    debug!("codemod started with verbosity level: {}", config.verbosity);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    match run(config).await {
        Ok(errors) if errors > 0 => std::process::exit(1),
        Ok(_) => {}
        Err(e) => {
            error!("Fatal error: {}", e);
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

/// Returns the number of files that failed to transform
async fn run(config: Config) -> anyhow::Result<usize> {
    let stdio = config.stdio;
    let runner = Runner::new(config, Host::new()).await?;
    let stats = runner.run().await?;

    if !stdio {
        eprintln!("{stats}");
    }
    Ok(stats.errors)
}
