use clap::Parser;
use tracing_subscriber::EnvFilter;
use ts_datastore::cli::Cli;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    match cli.run() {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("\nError: {e:#}\n");
            std::process::exit(1);
        },
    }
}
