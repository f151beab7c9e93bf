use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "wxagent")]
#[command(version)]
#[command(about = "Weather lookups with AI-generated summaries and alerts", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a place name to coordinates
    Geocode {
        /// Place name, e.g. "Hanoi"
        query: String,
    },
    /// Fetch a normalized weather snapshot
    Weather {
        #[command(flatten)]
        target: Target,
    },
    /// Summarize the weather for a place
    Summarize {
        #[command(flatten)]
        target: Target,
    },
    /// Extract structured weather risks for a place
    Alerts {
        #[command(flatten)]
        target: Target,
    },
    /// Ask a question about the weather for a place
    Chat {
        #[command(flatten)]
        target: Target,

        /// The question to answer
        #[arg(long)]
        question: String,
    },
    /// Show the effective configuration with secrets masked
    Config,
}

/// Where to look: a place name or explicit coordinates
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Place name to geocode
    #[arg(long, conflicts_with_all = ["lat", "lon"], required_unless_present_all = ["lat", "lon"])]
    pub query: Option<String>,

    /// Latitude in decimal degrees
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// metric, imperial or standard
    #[arg(long, default_value = "metric")]
    pub units: String,
}
