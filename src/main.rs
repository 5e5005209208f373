use clap::Parser;
use miette::Result;
use tmx::cli::{Cli, Commands};
use tmx::output::Printer;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let printer = Printer::new()
        .with_quiet(cli.quiet)
        .with_verbose(cli.verbose);

    match cli.command {
        Commands::Convert(args) => tmx::cli::convert::run(args, &printer)?,
        Commands::Completions(args) => tmx::cli::completions::run(args)?,
    }

    Ok(())
}
