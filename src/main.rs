mod cli;

use clap::Parser;

fn main() -> Result<(), anyhow::Error> {
    cli::Args::parse().run()
}
