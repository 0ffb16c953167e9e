use anyhow::Context;
use brawl_sdk::endpoint::RankingKind;
use brawl_sdk::Client;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::time::Duration;
use tracing::Level;

#[derive(Parser)]
#[command(name = "brawl", about = "Query the Brawl Stars API", version)]
struct Cli {
    /// API token
    #[arg(long, env = "BRAWLSTARS_TOKEN", hide_env_values = true)]
    token: String,

    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    timeout: u64,

    /// More logging, repeat for more
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Player profile
    Player { tag: String },
    Club { tag: String },
    /// Members of a club
    Members { tag: String },
    Battlelog { tag: String },
    /// Leaderboards: players, clubs or brawlers
    Rankings {
        kind: RankingKind,
        #[arg(long, default_value = "global")]
        region: String,
        #[arg(long, default_value_t = 200)]
        limit: u32,
        /// Brawler name or id, for brawler rankings
        #[arg(long)]
        brawler: Option<String>,
    },
    Brawlers,
    /// Current event rotation
    Events,
    Constants { key: Option<String> },
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .without_time()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut builder = Client::builder(&cli.token).timeout(Duration::from_secs(cli.timeout));
    if let Some(base_url) = &cli.base_url {
        builder = builder.base_url(base_url);
    }
    let client = builder.build().context("unable to create client")?;

    match cli.command {
        Commands::Player { tag } => print(&client.get_player(&tag).await?)?,
        Commands::Club { tag } => print(&client.get_club(&tag).await?)?,
        Commands::Members { tag } => print(&client.get_club_members(&tag).await?)?,
        Commands::Battlelog { tag } => print(&client.get_battle_log(&tag).await?)?,
        Commands::Rankings {
            kind,
            region,
            limit,
            brawler,
        } => {
            let mut request = client.rankings(kind).region(&region).limit(limit);
            if let Some(brawler) = brawler {
                request = request.brawler(brawler);
            }
            print(&request.send().await?)?
        }
        Commands::Brawlers => print(&client.get_brawlers().await?)?,
        Commands::Events => print(&client.get_event_rotation().await?)?,
        Commands::Constants { key } => print(&client.get_constants(key.as_deref()).await?)?,
    }

    client.close();
    Ok(())
}
