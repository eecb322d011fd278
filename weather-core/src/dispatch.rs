//! Event dispatch for the page.
//!
//! A trigger is split in two: [`Dispatcher::begin`] reads the page
//! synchronously and yields a [`Request`]; the request runs against the
//! backend without touching the page; [`Dispatcher::complete`] applies the
//! settled result. [`Dispatcher::run`] drives this from a channel with any
//! number of requests in flight, applying completions one at a time.

use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinSet};
use tracing::{debug, error};

use crate::{
    Config, FetchError, WeatherBackend,
    config::RacePolicy,
    model::{City, WeatherQuery, WeatherRecord},
    render::render,
    view::{FormInput, Page},
};

/// What can happen to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Page finished loading: load the cities.
    PageReady,
    /// The fetch button was pressed.
    FetchRequested,
    /// The user edited the form or picked a city.
    Input(FormInput),
}

/// Work to do against the backend on behalf of a trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Cities,
    Weather { seq: u64, query: WeatherQuery },
}

impl Request {
    pub async fn perform(self, backend: &dyn WeatherBackend) -> Completion {
        match self {
            Request::Cities => Completion::Cities(backend.fetch_cities().await),
            Request::Weather { seq, query } => Completion::Weather {
                seq,
                result: backend.fetch_weather(&query).await,
            },
        }
    }
}

/// A settled request.
#[derive(Debug)]
pub enum Completion {
    Cities(Result<Vec<City>, FetchError>),
    Weather {
        seq: u64,
        result: Result<Vec<WeatherRecord>, FetchError>,
    },
}

/// What a handled event did to the page.
#[derive(Debug)]
pub enum Outcome {
    FormUpdated,
    CitiesLoaded(usize),
    WeatherRendered(usize),
    /// Logged; the page was not touched.
    Failed(FetchError),
    /// A newer weather request already rendered successfully.
    Stale { seq: u64 },
}

#[derive(Debug)]
pub struct Dispatcher {
    page: Page,
    backend: Arc<dyn WeatherBackend>,
    race_policy: RacePolicy,
    issued: u64,
    /// Sequence number of the weather result currently rendered.
    applied: u64,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn WeatherBackend>, config: &Config) -> Self {
        Self {
            page: Page::new(config.default_unit),
            backend,
            race_policy: config.race_policy,
            issued: 0,
            applied: 0,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn into_page(self) -> Page {
        self.page
    }

    pub fn backend(&self) -> &Arc<dyn WeatherBackend> {
        &self.backend
    }

    /// Apply the synchronous part of `event`. Form input takes effect
    /// immediately; triggers return the request to run.
    pub fn begin(&mut self, event: Event) -> Option<Request> {
        match event {
            Event::PageReady => Some(Request::Cities),
            Event::FetchRequested => {
                self.issued += 1;
                Some(Request::Weather {
                    seq: self.issued,
                    query: self.page.query(),
                })
            }
            Event::Input(input) => {
                self.page.apply_input(input);
                None
            }
        }
    }

    /// Apply a settled request to its region of the page.
    pub fn complete(&mut self, completion: Completion) -> Outcome {
        match completion {
            Completion::Cities(Ok(cities)) => {
                debug!(count = cities.len(), ?cities, "Cities loaded");
                self.page.city_select_mut().append_cities(&cities);
                Outcome::CitiesLoaded(cities.len())
            }
            Completion::Cities(Err(err)) => {
                error!(error = %err, "Error fetching cities");
                Outcome::Failed(err)
            }
            Completion::Weather { result: Err(err), seq } => {
                error!(error = %err, seq, "Error fetching weather");
                Outcome::Failed(err)
            }
            Completion::Weather { result: Ok(records), seq } => {
                if self.race_policy == RacePolicy::LatestRequest && seq < self.applied {
                    debug!(seq, rendered = self.applied, "Discarding stale weather response");
                    return Outcome::Stale { seq };
                }

                debug!(count = records.len(), seq, "Weather loaded");
                self.applied = self.applied.max(seq);
                self.page.weather_data_mut().replace(render(&records));
                Outcome::WeatherRendered(records.len())
            }
        }
    }

    /// Handle one event to completion before returning.
    pub async fn handle(&mut self, event: Event) -> Outcome {
        match self.begin(event) {
            Some(request) => {
                let completion = request.perform(self.backend.as_ref()).await;
                self.complete(completion)
            }
            None => Outcome::FormUpdated,
        }
    }

    /// Consume events until the sender side closes and every request in
    /// flight has settled, then hand back the final page.
    pub async fn run(mut self, mut events: mpsc::Receiver<Event>) -> Page {
        let mut in_flight = JoinSet::new();
        let mut open = true;

        loop {
            tokio::select! {
                event = events.recv(), if open => match event {
                    Some(event) => {
                        if let Some(request) = self.begin(event) {
                            let backend = Arc::clone(&self.backend);
                            in_flight.spawn(async move { request.perform(backend.as_ref()).await });
                        }
                    }
                    None => open = false,
                },
                Some(joined) = in_flight.join_next() => match joined {
                    Ok(completion) => {
                        self.complete(completion);
                    }
                    Err(err) => error!(error = %err, "Request task did not complete"),
                },
                else => break,
            }
        }

        self.page
    }
}
