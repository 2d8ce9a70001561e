use clap::Parser;
use exec_report::batch::Batch;
use exec_report::cli::Cli;
use exec_report::engine::ProbeEngine;
use exec_report::error::{EXIT_MISSING_CLASSPATH, MissingClasspath};
use exec_report::layout::Layout;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let batch = Batch::new(ProbeEngine, Layout::default());

    match batch.run(&cli.root) {
        Ok(summary) => match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("failed to render batch summary: {err}");
                std::process::exit(1);
            }
        },
        Err(err) => {
            eprintln!("{err:#}");
            if err.downcast_ref::<MissingClasspath>().is_some() {
                std::process::exit(EXIT_MISSING_CLASSPATH);
            }
            std::process::exit(1);
        }
    }
}
