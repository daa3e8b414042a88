use clap::Parser;

mod app;
mod args;

fn main() {
    let args = args::Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    if let Err(e) = app::run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
