// CLI definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "anim-driver")]
#[command(author, version, about = "Host for ckb keyboard animation scripts")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path (default: ~/.config/ckb-anim/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Animations directory (overrides config)
    #[arg(short, long, global = true, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan the animations directory and list what was found
    #[command(visible_alias = "ls")]
    List {
        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// Probe one script and print its declarations and parameters
    Info {
        /// Path to the script executable
        path: PathBuf,
    },

    /// Run an animation and print the colors it produces
    Run {
        /// Animation id or name
        animation: String,

        /// Keys to animate, comma-separated (default: every key in the keymap)
        #[arg(short, long)]
        keys: Option<String>,

        /// Parameter override, NAME=VALUE (repeatable)
        #[arg(short, long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Stop after this many seconds (default: until Ctrl+C)
        #[arg(short, long)]
        seconds: Option<f64>,

        /// Tick rate (overrides config)
        #[arg(long)]
        fps: Option<u32>,

        /// Scripted key press, KEY@MS: press KEY at MS milliseconds and
        /// release it one tick later (repeatable)
        #[arg(long = "press", value_name = "KEY@MS")]
        presses: Vec<String>,
    },
}
