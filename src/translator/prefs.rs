//! Per-user preference record.

use std::fmt;

use crate::translator::style::Style;

/// Sampling temperature, kept within 0.1..=1.0 at one decimal of precision.
///
/// Stored as tenths so two temperatures that print the same compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Temperature(u8);

impl Temperature {
    pub const MIN: f32 = 0.1;
    pub const MAX: f32 = 1.0;

    pub fn new(value: f32) -> Result<Self, TemperatureError> {
        if !value.is_finite() {
            return Err(TemperatureError::NotANumber(value.to_string()));
        }
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(TemperatureError::OutOfRange(value));
        }
        Ok(Self((value * 10.0).round() as u8))
    }

    /// Parse user input such as "0.5" or "0,5".
    pub fn parse(input: &str) -> Result<Self, TemperatureError> {
        let normalized = input.trim().replace(',', ".");
        let value: f32 = normalized
            .parse()
            .map_err(|_| TemperatureError::NotANumber(input.trim().to_string()))?;
        Self::new(value)
    }

    pub fn value(self) -> f32 {
        f32::from(self.0) / 10.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.value())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemperatureError {
    NotANumber(String),
    OutOfRange(f32),
}

impl fmt::Display for TemperatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotANumber(s) => write!(f, "'{s}' is not a number"),
            Self::OutOfRange(v) => write!(
                f,
                "{v} is outside the allowed range {:.1}-{:.1}",
                Temperature::MIN,
                Temperature::MAX
            ),
        }
    }
}

impl std::error::Error for TemperatureError {}

/// The boolean display and prompt options a user can flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    PreserveFormat,
    AddNotes,
    ShowOriginal,
}

impl Toggle {
    pub fn key(self) -> &'static str {
        match self {
            Toggle::PreserveFormat => "format",
            Toggle::AddNotes => "notes",
            Toggle::ShowOriginal => "original",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "format" => Some(Toggle::PreserveFormat),
            "notes" => Some(Toggle::AddNotes),
            "original" => Some(Toggle::ShowOriginal),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Toggle::PreserveFormat => "Keep formatting",
            Toggle::AddNotes => "Translator notes",
            Toggle::ShowOriginal => "Show original",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub style: Style,
    pub temperature: Temperature,
    pub preserve_format: bool,
    pub add_notes: bool,
    /// Always a code known to [`crate::translator::language::Language`].
    pub target_language: String,
    pub show_original: bool,
}

impl Preferences {
    /// Defaults for a new user, translating into `language`.
    pub fn with_language(language: &str) -> Self {
        Self {
            style: Style::Professional,
            temperature: Temperature(3),
            preserve_format: true,
            add_notes: false,
            target_language: language.to_string(),
            show_original: false,
        }
    }

    pub fn get(&self, toggle: Toggle) -> bool {
        match toggle {
            Toggle::PreserveFormat => self.preserve_format,
            Toggle::AddNotes => self.add_notes,
            Toggle::ShowOriginal => self.show_original,
        }
    }

    /// Flip a flag and return its new value.
    pub fn toggle(&mut self, toggle: Toggle) -> bool {
        let flag = match toggle {
            Toggle::PreserveFormat => &mut self.preserve_format,
            Toggle::AddNotes => &mut self.add_notes,
            Toggle::ShowOriginal => &mut self.show_original,
        };
        *flag = !*flag;
        *flag
    }
}
