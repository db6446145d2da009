use anyhow::Context;
use chrono::{Days, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use sellbot::config::BotConfig;
use sellbot::execution::{PositionTracker, TrackerSettings};
use sellbot::feed::{JsonLinesFeed, QuoteScenario, SyntheticQuoteFeed};
use sellbot::models::{Position, Quote};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use tokio::time::Duration;

#[derive(Parser)]
#[command(name = "sellbot", about = "Trend-confirmed exit signals for a held position")]
struct Cli {
    /// TOML config file (SELLBOT__* environment variables override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Feed JSON-lines quotes into the tracker until it signals a sale
    Watch {
        /// Quote file, or `-` for stdin
        #[arg(long, default_value = "-")]
        quotes: String,

        /// Space ticks by the refresh rate
        #[arg(long)]
        paced: bool,
    },
    /// Drive the tracker with a synthetic quote stream
    Demo {
        #[arg(long, value_enum, default_value_t = QuoteScenario::Spike)]
        scenario: QuoteScenario,

        #[arg(long, default_value_t = 720)]
        ticks: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long)]
        paced: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();

    match cli.command {
        Command::Watch { quotes, paced } => {
            let config = BotConfig::load(cli.config.as_deref())?;
            let (position, settings) = config.tracker_parts()?;
            let pace = paced.then(|| Duration::from_secs(settings.sell.refresh_rate_secs));
            let tracker = PositionTracker::new(position, settings)?;

            let reader = open_quotes(&quotes)?;
            let feed = JsonLinesFeed::new(reader).map(|q| q.map_err(anyhow::Error::from));
            drive(tracker, feed, pace).await
        }
        Command::Demo {
            scenario,
            ticks,
            seed,
            paced,
        } => {
            let (position, settings) = match cli.config.as_deref() {
                Some(path) => BotConfig::load(Some(path))?.tracker_parts()?,
                None => (demo_position(), TrackerSettings::default()),
            };
            let pace = paced.then(|| Duration::from_secs(settings.sell.refresh_rate_secs));

            // Start at the 09:30 open of the day after entry, market time
            let start = position
                .entry_date
                .checked_add_days(Days::new(1))
                .and_then(|d| d.and_hms_opt(9, 30, 0))
                .and_then(|t| position.timezone.from_local_datetime(&t).single())
                .context("Entry date out of range")?;
            let mut generator = SyntheticQuoteFeed::new(
                seed,
                position.symbol.clone(),
                position.entry_price,
                start.with_timezone(&Utc),
                settings.sell.refresh_rate_secs,
            );
            let quotes = generator.generate(scenario, ticks);

            tracing::info!("Demo: {:?} scenario, {} ticks, seed {}", scenario, ticks, seed);
            let tracker = PositionTracker::new(position, settings)?;
            drive(tracker, quotes.into_iter().map(Ok), pace).await
        }
    }
}

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sellbot=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn open_quotes(source: &str) -> anyhow::Result<Box<dyn BufRead>> {
    if source == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }

    let file = File::open(source).with_context(|| format!("Failed to open {}", source))?;
    Ok(Box::new(BufReader::new(file)))
}

fn demo_position() -> Position {
    let entry_date = NaiveDate::from_ymd_opt(2019, 5, 22).unwrap_or_default();
    Position::new("ZM", 84.88, entry_date).with_quantity(11.0)
}

/// Feed quotes one tick at a time until the first sell signal
async fn drive<I>(mut tracker: PositionTracker, quotes: I, pace: Option<Duration>) -> anyhow::Result<()>
where
    I: Iterator<Item = anyhow::Result<Quote>>,
{
    let mut ticker = pace.map(tokio::time::interval);
    let mut ticks = 0usize;

    for item in quotes {
        if let Some(ticker) = ticker.as_mut() {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("⚠️  Received Ctrl+C, stopping");
                    break;
                }
            }
        }

        let quote = match item {
            Ok(quote) => quote,
            Err(e) => {
                tracing::warn!("Skipping quote: {:#}", e);
                continue;
            }
        };

        match tracker.on_quote(quote) {
            Ok(report) => {
                ticks += 1;
                println!("{}", report.summary());

                if report.decision() {
                    tracing::info!(
                        "🔻 Sell {} @ ${:.2} after {} ticks ({:+.2}%, {:+.2}$ total)",
                        report.symbol,
                        report.last_trade_price,
                        ticks,
                        report.pnl_rate * 100.0,
                        report.total_pnl
                    );
                    return Ok(());
                }
            }
            // Already logged by the tracker; the next tick may be good
            Err(e) if e.is_input() => continue,
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!(
        "Quote stream ended after {} ticks without a sell signal for {}",
        ticks,
        tracker.position().symbol
    );
    Ok(())
}
