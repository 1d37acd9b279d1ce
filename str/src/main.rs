use clap::Parser;
use std::process;
use str_runner::{CmdExector, Opts};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, Layer as _};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let opts = Opts::parse();

    let level = match opts.verbose {
        true => LevelFilter::DEBUG,
        false => LevelFilter::WARN,
    };
    let layer = Layer::new().with_writer(std::io::stderr).with_filter(level);
    tracing_subscriber::registry().with(layer).init();

    // exit codes are reserved for test results; a broken harness aborts
    match opts.execute().await {
        Ok(code) => process::exit(code),
        Err(e) => panic!("{e:?}"),
    }
}
