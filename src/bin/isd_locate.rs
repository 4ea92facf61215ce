use chrono::Local;
use clap::{Parser, Subcommand};
use isd_locator::{IsdError, IsdLocator, LatLon, StoreStatus, ISD_HISTORY_URL};
use log::error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// Find the nearest NOAA ISD weather station for a location.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Directory holding the station store. Defaults to the system cache directory.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Refresh a missing or stale store without asking.
    #[arg(short, long, global = true)]
    yes: bool,

    /// Where the station catalog is downloaded from.
    #[arg(long, global = true, default_value = ISD_HISTORY_URL)]
    source: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a single latitude/longitude.
    #[command(allow_negative_numbers = true)]
    Locate {
        latitude: f64,
        longitude: f64,
        /// Print every station tied at the minimum distance.
        #[arg(long)]
        all_ties: bool,
        /// Also consider stations that stopped reporting.
        #[arg(long)]
        include_inactive: bool,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Label every row of a CSV with Latitude/Longitude columns.
    Batch {
        input: PathBuf,
        /// Directory for labeled_stations.csv. Defaults to the input's directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long)]
        include_inactive: bool,
    },
    /// Replace the station store, from the download source or a local file.
    Refresh {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Show how fresh the station store is.
    Status,
}

fn prompt(status: &StoreStatus) -> bool {
    let question = match status {
        StoreStatus::Empty => "No station data found. Download it now?".to_string(),
        StoreStatus::Stale { latest, .. } => {
            format!("Station data is stale (latest END date {}). Refresh now?", latest)
        }
        StoreStatus::Fresh { .. } => return false,
    };
    print!("{} [y/N] ", question);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

async fn run(cli: Cli) -> Result<(), IsdError> {
    let cache_dir = match cli.cache_dir {
        Some(dir) => dir,
        None => IsdLocator::default_cache_folder()?,
    };
    let today = Local::now().date_naive();

    if let Command::Refresh { file } = &cli.command {
        let mut locator = IsdLocator::open_or_create(cache_dir).await?;
        let inserted = match file {
            Some(path) => locator.refresh_from_file(path).await?,
            None => locator.refresh(&cli.source).await?,
        };
        println!("{} stations loaded", inserted);
        return locator.close();
    }

    let yes = cli.yes;
    let locator = IsdLocator::open_or_refresh(cache_dir, &cli.source, today, |status: &StoreStatus| {
        yes || prompt(status)
    })
    .await?;

    match cli.command {
        Command::Locate {
            latitude,
            longitude,
            all_ties,
            include_inactive,
            json,
        } => {
            let resolution = locator
                .find_closest()
                .location(LatLon(latitude, longitude))
                .active_only(!include_inactive)
                .call()?;
            if all_ties {
                if json {
                    println!("{}", serde_json::to_string_pretty(resolution.tied())?);
                } else {
                    for scored in resolution.tied() {
                        let s = &scored.station;
                        println!(
                            "{} {} {} {}",
                            s.usaf,
                            s.wban,
                            s.station_name.as_deref().unwrap_or("-"),
                            scored.distance_miles
                        );
                    }
                }
            } else {
                let single = resolution.single();
                if json {
                    println!("{}", serde_json::to_string_pretty(&single)?);
                } else {
                    println!("{} {} {}", single.usaf, single.wban, single.distance_miles);
                }
            }
        }
        Command::Batch {
            input,
            output_dir,
            include_inactive,
        } => {
            let (labeled, written) = locator
                .find_closest_csv()
                .input(&input)
                .maybe_output_dir(output_dir.as_deref())
                .active_only(!include_inactive)
                .call()?;
            println!("{} rows written to {}", labeled.height(), written.display());
        }
        Command::Status => match locator.status(today)? {
            StoreStatus::Fresh { latest } => println!("fresh (latest END date {})", latest),
            StoreStatus::Stale { latest, cutoff } => {
                println!("stale (latest END date {}, cutoff {})", latest, cutoff)
            }
            StoreStatus::Empty => println!("empty"),
        },
        Command::Refresh { .. } => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
