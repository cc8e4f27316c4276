use core::error::Error;
use std::io;

use clap::{CommandFactory, Parser};
use stress_test::{
    cfg::Config,
    cmd::{Cmd, Format},
    report,
    runtime::Runtime,
};
use tokio::runtime::Builder;

pub fn main() {
    let cmd = match Cmd::try_parse() {
        Ok(cmd) => cmd,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    if let Err(err) = stress_test::logging::init(cmd.verbose as usize) {
        eprintln!("ERROR: {err}");
        std::process::exit(1);
    }

    let cfg = match Config::try_from(cmd) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("{err}");
            let _ = Cmd::command().print_help();
            std::process::exit(1);
        }
    };

    if let Err(err) = run(cfg) {
        eprintln!("ERROR: {err}");
        std::process::exit(1);
    }
}

fn run(cfg: Config) -> Result<(), Box<dyn Error>> {
    if cfg.format == Format::Text {
        println!(
            "Starting stress test on {} with {} requests and {} concurrency",
            cfg.target, cfg.requests, cfg.concurrency
        );
    }

    let report = Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .thread_name("stress-test:w")
        .build()?
        .block_on(async {
            let runtime = Runtime::new(cfg.clone());

            runtime.run().await
        })?;

    report::render(&mut io::stdout().lock(), &cfg, &report)?;

    Ok(())
}
