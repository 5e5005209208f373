pub mod completions;
pub mod convert;

use clap::{Parser, Subcommand};

/// img2tmx - Convert map images into Tiled maps and tilesets
#[derive(Parser, Debug)]
#[command(name = "img2tmx")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Only print warnings and errors
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Print extra detail about each conversion
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert map images to .tmx tilemaps with deduplicated tilesets
    Convert(convert::ConvertArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}
