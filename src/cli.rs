use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "stale-deps")]
#[command(about = "Detect stale JVM build dependencies from compiled class output")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    Check {
        #[arg(long, value_name = "FILE")]
        graph: PathBuf,

        #[arg(long, value_name = "NAME")]
        unit: Vec<String>,

        #[arg(long)]
        full: bool,
    },
    Report {
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
    },
    Clear {
        #[arg(long, value_name = "FILE")]
        graph: PathBuf,
    },
}
