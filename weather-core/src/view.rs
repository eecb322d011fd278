//! Owned view-state for the page.
//!
//! Each region has exactly one writer: the city selector is filled only by
//! the city pipeline, the weather container is replaced only by the
//! weather pipeline. The form is edited through [`FormInput`].

use std::fmt;

use crate::{
    model::{City, Unit, WeatherQuery},
    render::ContainerContent,
};

/// One entry of the city selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl fmt::Display for SelectOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// The city dropdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitySelector {
    options: Vec<SelectOption>,
    selected: Option<String>,
}

impl CitySelector {
    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Current value: the explicit selection, else the first option, else
    /// an empty string when nothing was ever loaded.
    pub fn value(&self) -> &str {
        self.selected
            .as_deref()
            .or_else(|| self.options.first().map(|o| o.value.as_str()))
            .unwrap_or("")
    }

    /// Label of the option matching the current value, if any.
    pub fn selected_label(&self) -> Option<&str> {
        let value = self.value();
        self.options
            .iter()
            .find(|o| o.value == value)
            .map(|o| o.label.as_str())
    }

    /// Append one option per city, in the order given.
    pub(crate) fn append_cities(&mut self, cities: &[City]) {
        self.options.extend(cities.iter().map(|city| SelectOption {
            value: city.id.to_string(),
            label: city.name.clone(),
        }));
    }

    fn select(&mut self, value: String) {
        self.selected = Some(value);
    }
}

impl fmt::Display for CitySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for option in &self.options {
            writeln!(f, "{:>6}  {}", option.value, option.label)?;
        }
        Ok(())
    }
}

/// Unit radio group and the two date inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    pub unit: Unit,
    pub start_date: String,
    pub end_date: String,
}

/// A user edit of the form or the selector's current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormInput {
    /// Not checked against the loaded options.
    SelectCity(String),
    SetUnit(Unit),
    SetStartDate(String),
    SetEndDate(String),
}

/// Where weather output is shown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherContainer {
    content: ContainerContent,
}

impl WeatherContainer {
    pub fn content(&self) -> &ContainerContent {
        &self.content
    }

    /// Clear the container and show `content` instead.
    pub(crate) fn replace(&mut self, content: ContainerContent) {
        self.content = content;
    }

    pub fn to_html(&self) -> String {
        self.content.to_html()
    }
}

impl fmt::Display for WeatherContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.content, f)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    city_select: CitySelector,
    form: Form,
    weather_data: WeatherContainer,
}

impl Page {
    /// An empty page with `unit` pre-checked.
    pub fn new(unit: Unit) -> Self {
        Self {
            form: Form {
                unit,
                ..Form::default()
            },
            ..Self::default()
        }
    }

    pub fn city_select(&self) -> &CitySelector {
        &self.city_select
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn weather_data(&self) -> &WeatherContainer {
        &self.weather_data
    }

    pub(crate) fn city_select_mut(&mut self) -> &mut CitySelector {
        &mut self.city_select
    }

    pub(crate) fn weather_data_mut(&mut self) -> &mut WeatherContainer {
        &mut self.weather_data
    }

    pub fn apply_input(&mut self, input: FormInput) {
        match input {
            FormInput::SelectCity(value) => self.city_select.select(value),
            FormInput::SetUnit(unit) => self.form.unit = unit,
            FormInput::SetStartDate(date) => self.form.start_date = date,
            FormInput::SetEndDate(date) => self.form.end_date = date,
        }
    }

    /// Read the four query values as they stand right now.
    pub fn query(&self) -> WeatherQuery {
        WeatherQuery {
            city_id: self.city_select.value().to_string(),
            start_date: self.form.start_date.clone(),
            end_date: self.form.end_date.clone(),
            unit: self.form.unit,
        }
    }
}
