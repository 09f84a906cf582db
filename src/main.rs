mod aggregator;
mod ai;
mod analysis;
mod candles;
mod display;
mod indicators;
mod movers;
mod news;
mod recommendation;
mod search;
mod signals;
mod social;
mod storage_utils;

use anyhow::Context;
use reqwest::Client;
use tracing_subscriber::EnvFilter;

use aggregator::Sources;
use ai::OpenRouterClient;
use candles::ChartClient;
use news::NewsClient;
use search::{SearchClient, SearchSession};
use social::SocialClient;
use storage_utils::{AppConfig, AsyncStorageManager};

fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn print_usage() {
    println!("Usage: stock-advisor <COMMAND>");
    println!();
    println!("Commands:");
    println!("  analyze <SYMBOL>   full multi-source analysis with a recommendation");
    println!("  movers             today's top movers across the configured universe");
    println!("  search <QUERY>     look up ticker symbols");
    println!("  ask <MESSAGE>      free-form question to the AI assistant");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let storage = AsyncStorageManager::new_relative("storage").await?;
    let config = AppConfig::load_or_default(&storage).await?;

    let client = Client::builder().pool_max_idle_per_host(50).build()?;
    let chart = ChartClient::new(client.clone());
    let news = NewsClient::new(client.clone(), env_key("NEWSAPI_API_KEY"));
    let social = SocialClient::new(client.clone(), env_key("X_BEARER_TOKEN"));
    let completion = OpenRouterClient::new(client.clone(), env_key("OPENROUTER_API_KEY"));
    let sources = Sources {
        price: &chart,
        news: &news,
        social: &social,
        completion: &completion,
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.split_first() {
        Some((command, rest)) if command == "analyze" => {
            let symbol = rest
                .first()
                .context("usage: stock-advisor analyze <SYMBOL>")?;
            let report = analysis::analyze(&sources, &config, symbol).await?;
            display::print_report(&report);
        }
        Some((command, _)) if command == "movers" => {
            println!(
                "Ranking {} symbols over the last {}...",
                config.movers.universe.len(),
                config.movers.range
            );
            let movers = movers::top_movers(&chart, &config.movers).await;
            display::print_movers(&movers);
        }
        Some((command, rest)) if command == "search" => {
            let query = rest.join(" ");
            let lookup = SearchClient::new(client.clone());
            let session = SearchSession::new();
            if let Some(matches) = session.search(&lookup, &query).await? {
                display::print_matches(&matches);
            }
        }
        Some((command, rest)) if command == "ask" => {
            let message = rest.join(" ");
            if message.trim().is_empty() {
                anyhow::bail!("usage: stock-advisor ask <MESSAGE>");
            }
            println!("{}", ai::chat(&completion, &message).await);
        }
        _ => print_usage(),
    }

    Ok(())
}
