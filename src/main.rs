use clap::Parser;
use http_stat::{banner, cli::Cli, execute_request, version, Config};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the report.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "http_stat=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if !cli.no_banner {
        println!("{}", banner::render());
    }
    if cli.version {
        println!("{}", version::get());
        return ExitCode::SUCCESS;
    }

    let config = Config::from_env();
    let request = match cli.into_request() {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(code = e.code(), "{}", e);
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling request");
            on_interrupt.cancel();
        }
    });

    let report = match execute_request(request, &config, cancel).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(code = e.code(), "{}", e);
            return ExitCode::FAILURE;
        }
    };

    for (i, hop) in report.hops.iter().enumerate() {
        if i > 0 {
            println!();
        }
        for line in banner::render_hop(hop) {
            println!("{}", line);
        }
    }

    match &report.capture {
        Ok(outcome) => {
            if let Some(line) = banner::style_outcome(outcome) {
                println!();
                println!("{}", line);
            }
        }
        Err(e) => tracing::error!("{}", e),
    }

    ExitCode::SUCCESS
}
