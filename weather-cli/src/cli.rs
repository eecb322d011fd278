use anyhow::Context;
use chrono::{Duration, Local};
use clap::{Parser, Subcommand};
use inquire::{Confirm, CustomType, Select, Text};
use tokio::sync::mpsc;
use tracing::{info, warn};
use weather_viewer_core::{
    Config, Dispatcher, Event, FormInput, HttpBackend, Outcome, Page, RacePolicy, Unit,
    backend_from_config,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-viewer", version, about = "Browse city weather from a weather backend")]
pub struct Cli {
    /// Backend base URL; overrides the configured one for this run.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure backend URL, timeout, default unit and overlap policy.
    Configure,

    /// List the cities offered by the backend.
    Cities,

    /// Show weather for a city id and date range.
    Show {
        /// City id, sent as-is even if the backend did not list it.
        #[arg(long)]
        city_id: String,

        /// Start of the range, e.g. 2024-01-01.
        #[arg(long, default_value = "")]
        start: String,

        /// End of the range, e.g. 2024-01-07.
        #[arg(long, default_value = "")]
        end: String,

        /// "metric" or "imperial"; defaults to the configured unit.
        #[arg(long, value_parser = parse_unit)]
        unit: Option<Unit>,

        /// Print the container as HTML instead of text.
        #[arg(long)]
        html: bool,
    },

    /// Pick a city, unit and dates interactively and fetch repeatedly.
    Browse,

    /// Register a new city with the backend.
    AddCity {
        name: String,
    },

    /// Ask the backend to pull fresh data for a city.
    Refresh {
        city_name: String,
    },
}

fn parse_unit(value: &str) -> Result<Unit, String> {
    Unit::try_from(value).map_err(|e| e.to_string())
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }

        match self.command {
            Command::Configure => configure(config),
            Command::Cities => cities(&config).await,
            Command::Show {
                city_id,
                start,
                end,
                unit,
                html,
            } => {
                let mut inputs = vec![
                    FormInput::SelectCity(city_id),
                    FormInput::SetStartDate(start),
                    FormInput::SetEndDate(end),
                ];
                if let Some(unit) = unit {
                    inputs.push(FormInput::SetUnit(unit));
                }

                let page = show(&config, inputs).await?;
                if html {
                    println!("{}", page.weather_data().to_html());
                } else {
                    print_weather(&page);
                }
                Ok(())
            }
            Command::Browse => browse(&config).await,
            Command::AddCity { name } => {
                let backend = backend_from_config(&config)?;
                let city = backend
                    .create_city(&name)
                    .await
                    .with_context(|| format!("Failed to create city '{name}'"))?;
                println!("Created city {} with id {}", city.name, city.id);
                Ok(())
            }
            Command::Refresh { city_name } => {
                let backend = backend_from_config(&config)?;
                backend
                    .request_refresh(&city_name)
                    .await
                    .with_context(|| format!("Failed to refresh weather for '{city_name}'"))?;
                println!("Requested fresh weather data for {city_name}");
                Ok(())
            }
        }
    }
}

async fn cities(config: &Config) -> anyhow::Result<()> {
    let mut dispatcher = Dispatcher::new(backend_from_config(config)?, config);

    if let Outcome::CitiesLoaded(count) = dispatcher.handle(Event::PageReady).await {
        info!(count, "Loaded cities");
    }
    print!("{}", dispatcher.page().city_select());

    Ok(())
}

/// Load the page, apply `inputs` and fetch, all through the event loop.
/// The weather request does not wait for the city list.
async fn show(config: &Config, inputs: Vec<FormInput>) -> anyhow::Result<Page> {
    let dispatcher = Dispatcher::new(backend_from_config(config)?, config);
    let (tx, rx) = mpsc::channel(inputs.len() + 2);
    let event_loop = tokio::spawn(dispatcher.run(rx));

    let events = std::iter::once(Event::PageReady)
        .chain(inputs.into_iter().map(Event::Input))
        .chain(std::iter::once(Event::FetchRequested));
    for event in events {
        tx.send(event).await.context("Event loop stopped early")?;
    }
    drop(tx);

    event_loop.await.context("Event loop task failed")
}

async fn browse(config: &Config) -> anyhow::Result<()> {
    let mut dispatcher = Dispatcher::new(backend_from_config(config)?, config);
    dispatcher.handle(Event::PageReady).await;

    let today = Local::now().date_naive();
    let mut start_default = (today - Duration::days(7)).format("%Y-%m-%d").to_string();
    let mut end_default = (today + Duration::days(7)).format("%Y-%m-%d").to_string();

    loop {
        let options = dispatcher.page().city_select().options().to_vec();
        if options.is_empty() {
            warn!("No cities loaded; fetching with an empty city id");
        } else {
            let choice = Select::new("City:", options).prompt()?;
            dispatcher
                .handle(Event::Input(FormInput::SelectCity(choice.value)))
                .await;
        }

        let current = dispatcher.page().form().unit;
        let unit = Select::new("Unit:", Unit::all().to_vec())
            .with_starting_cursor(cursor_of(Unit::all(), &current))
            .prompt()?;
        let start = Text::new("Start date:").with_default(&start_default).prompt()?;
        let end = Text::new("End date:").with_default(&end_default).prompt()?;

        for input in [
            FormInput::SetUnit(unit),
            FormInput::SetStartDate(start.clone()),
            FormInput::SetEndDate(end.clone()),
        ] {
            dispatcher.handle(Event::Input(input)).await;
        }
        dispatcher.handle(Event::FetchRequested).await;
        print_weather(dispatcher.page());

        if !Confirm::new("Fetch again?").with_default(true).prompt()? {
            break;
        }
        start_default = start;
        end_default = end;
    }

    Ok(())
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let base_url = Text::new("Backend base URL:")
        .with_default(&config.base_url)
        .prompt()?;
    let timeout_secs = CustomType::<u64>::new("Request timeout (seconds):")
        .with_default(config.timeout_secs)
        .prompt()?;
    let default_unit = Select::new("Default unit:", Unit::all().to_vec())
        .with_starting_cursor(cursor_of(Unit::all(), &config.default_unit))
        .prompt()?;
    let race_policy = Select::new(
        "When fetches overlap, render the result of:",
        RacePolicy::all().to_vec(),
    )
    .with_starting_cursor(cursor_of(RacePolicy::all(), &config.race_policy))
    .prompt()?;

    config.base_url = base_url;
    config.timeout_secs = timeout_secs;
    config.default_unit = default_unit;
    config.race_policy = race_policy;

    HttpBackend::new(&config.base_url, config.timeout())?;
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn print_weather(page: &Page) {
    if let Some(label) = page.city_select().selected_label() {
        println!("Weather for {label}");
    }
    print!("{}", page.weather_data());
}

fn cursor_of<T: PartialEq>(all: &[T], current: &T) -> usize {
    all.iter().position(|item| item == current).unwrap_or(0)
}
