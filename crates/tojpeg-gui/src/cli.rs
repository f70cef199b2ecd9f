use clap::Parser;
use std::path::PathBuf;

/// tojpeg - drop images on the window, get JPEGs back
#[derive(Parser, Debug, Default)]
#[command(name = "tojpeg")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Files or folders to queue at startup (also what Explorer passes when
    /// files are dropped onto the executable)
    pub files: Vec<PathBuf>,

    /// Output directory (overrides the saved setting)
    #[arg(short, long, env = "TOJPEG_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// JPEG quality 1-100 (overrides the saved setting)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
