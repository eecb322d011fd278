//! Core library for the `weather-viewer` client.
//!
//! This crate defines:
//! - Configuration handling
//! - The backend client (`/cities`, `/weather`) and its error taxonomy
//! - Owned view-state for the page and the weather renderer
//! - Event dispatch tying triggers to request/render pipelines
//!
//! It is used by `weather-viewer`, but can also drive other front ends.

pub mod backend;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod render;
pub mod view;

pub use backend::{WeatherBackend, backend_from_config, http::HttpBackend};
pub use config::{Config, RacePolicy};
pub use dispatch::{Completion, Dispatcher, Event, Outcome, Request};
pub use error::FetchError;
pub use model::{City, Unit, WeatherQuery, WeatherRecord};
pub use render::{ContainerContent, NO_DATA_MESSAGE, WeatherBlock};
pub use view::{CitySelector, Form, FormInput, Page, SelectOption, WeatherContainer};
