//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "wallcycle")]
#[command(about = "Use directory of pictures as wallpapers.", long_about = None)]
pub struct Cli {
    /// Directory to use as wallpaper source.
    pub directory: PathBuf,

    /// Randomize wallpaper order.
    #[arg(short, long)]
    pub random: bool,

    /// Minutes to display one wallpaper before change [default: 5].
    #[arg(short, long, value_name = "MINUTES", value_parser = clap::value_parser!(u64).range(1..))]
    pub time: Option<u64>,

    /// Read settings from this JSON file instead of the default location.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
