use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;
use url::Url;

use page_relay::config::{AssetsConfig, RewriteConfig};
use page_relay::rewrite::{rewrite_html, RewriteContext, RewriteSettings};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Operator CLI for page-relay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query a running relay's health endpoint
    Health {
        #[arg(short, long, default_value = "http://localhost:3000")]
        url: String,
    },
    /// Rewrite a saved HTML file offline and print the result
    Rewrite {
        /// HTML file to rewrite
        file: PathBuf,

        /// URL the page was fetched from; relative references resolve against it
        #[arg(short, long)]
        base: String,

        /// Print rewrite counters to stderr
        #[arg(long)]
        stats: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Health { url } => {
            let client = reqwest::Client::new();
            let res = client
                .get(format!("{}/health", url.trim_end_matches('/')))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Rewrite { file, base, stats } => {
            let html = tokio::fs::read_to_string(&file).await?;
            let base = Url::parse(&base)?;
            let settings =
                RewriteSettings::from_config(&RewriteConfig::default(), &AssetsConfig::default());

            let rewritten = rewrite_html(&html, RewriteContext::new(&base, &settings));
            println!("{}", rewritten.html);
            if stats {
                eprintln!(
                    "outcome={} rewritten={} skipped={} removed={} failed={}",
                    rewritten.outcome.as_str(),
                    rewritten.stats.rewritten,
                    rewritten.stats.skipped,
                    rewritten.stats.removed,
                    rewritten.stats.failed,
                );
            }
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: relay returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
