mod args;
mod call;
mod logging;

use clap::Parser;
use tracing::Level;

use crate::args::Args;
use crate::logging::log_writer;

fn main() {
    let args = Args::parse();
    let writer = log_writer(args.log.as_deref()).unwrap_or_else(|err| {
        eprintln!("failed to open log file: {err}");
        std::process::exit(1);
    });

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_target(false)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|err| {
            eprintln!("failed to start runtime: {err}");
            std::process::exit(1);
        });

    let outcome = runtime.block_on(async {
        let config = args.caller_config()?;
        let caller = call::build_caller(&args, config)?;
        call::run(&args, &caller).await
    });

    match outcome {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("failed to render result: {err}");
                std::process::exit(1);
            }
        },
        Err(err) => {
            eprintln!("{err}");
            // Status failures are the procedure's answer, not a broken call.
            std::process::exit(if err.is_status() { 2 } else { 1 });
        }
    }
}
