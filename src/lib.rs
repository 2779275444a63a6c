use clap::Parser;
use tracing::debug;

pub mod date;
pub mod decode;
pub mod error;
pub mod fetch;
pub mod table;

pub use error::Error;
pub use fetch::{FetchConfig, Fetcher};
pub use table::{RateEntry, RateTable};

/// Get the official rate of one currency against the rouble from the Central Bank of Russia.
///
/// Prints `CODE (Name) value` for every entry of the day's table with the requested code, or
/// `nothing found`.
#[derive(Parser)]
pub struct Cli {
    /// Currency code, matched exactly (e.g. USD, EUR)
    #[arg(short, long, default_value = "USD")]
    pub code: String,
    /// Date of the rate table (format: YYYY-MM-DD)
    #[arg(short, long, default_value = "2022-10-08")]
    pub date: String,

    /// Daily rate table endpoint; `?date_req=DD/MM/YYYY` is appended
    #[arg(long, env = "CBR_ENDPOINT", default_value = fetch::CBR_DAILY_URL)]
    pub endpoint: String,

    /// Print matches as a JSON array
    #[clap(long)]
    pub json: bool,
}

impl Cli {
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            endpoint: self.endpoint.clone(),
            ..FetchConfig::default()
        }
    }
}

/// Fetch and decode the rate table for `args.date`.
///
/// The date is validated before any request is made.
pub fn retrieve_rates(args: &Cli) -> Result<RateTable, Error> {
    let request_date = date::format_request_date(&args.date)?;
    let fetcher = Fetcher::new(args.fetch_config());
    let body = fetcher.fetch(&request_date)?;
    let table = decode::decode_rate_table(&body)?;
    debug!(requested = %args.date, published = ?table.date, "retrieved rate table");
    Ok(table)
}
