use anyhow::Context;
use clap::Parser;
use copytree::cancellation::CancellationToken;
use copytree::cli::Cli;
use copytree::events::EventSink;
use copytree::Error;
use crossbeam_channel::bounded;
use log::{debug, error};
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(app_err) = e.downcast_ref::<Error>() {
                match app_err {
                    Error::Cancelled => {
                        eprintln!("Operation cancelled.");
                        return ExitCode::from(130);
                    }
                    Error::SecretsDetected { count, .. } => {
                        eprintln!("copytree: aborted, {count} secret finding(s) detected");
                        debug!("detail: {e:#}");
                        return ExitCode::from(3);
                    }
                    _ => {}
                }
            }
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let options = cli.into_options().context("invalid command line")?;
    let profile = cli.resolve_profile().context("could not resolve profile")?;

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        handler_token.cancel();
    })
    .context("could not install signal handler")?;

    // The progress observer only draws on interactive stderr, and never
    // when the document itself goes to stdout in streaming mode.
    let mut observer = None;
    let events = if copytree::progress::stderr_is_interactive() && !options.dry_run {
        let (tx, rx) = bounded(1024);
        observer = Some(copytree::progress::spawn_observer(rx));
        EventSink::new(tx)
    } else {
        EventSink::disabled()
    };

    let result = copytree::run(options, profile, events, cancel);

    if let Some(handle) = observer {
        // The sink inside the pipeline is dropped once run returns; the
        // observer exits when the channel closes.
        let _ = handle.join();
    }

    result.map(|_| ()).map_err(Into::into)
}
