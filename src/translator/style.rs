//! Translation styles. Each style is a system prompt variant with its own
//! recommended sampling temperature.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Professional,
    Casual,
    Academic,
    Creative,
    Technical,
}

impl Style {
    pub const ALL: [Style; 5] = [
        Style::Professional,
        Style::Casual,
        Style::Academic,
        Style::Creative,
        Style::Technical,
    ];

    /// Stable identifier stored in the database and in callback data.
    pub fn key(self) -> &'static str {
        match self {
            Style::Professional => "professional",
            Style::Casual => "casual",
            Style::Academic => "academic",
            Style::Creative => "creative",
            Style::Technical => "technical",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Style::Professional => "💼",
            Style::Casual => "😊",
            Style::Academic => "🎓",
            Style::Creative => "🎨",
            Style::Technical => "⚙️",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Style::Professional => "Professional",
            Style::Casual => "Casual",
            Style::Academic => "Academic",
            Style::Creative => "Creative",
            Style::Technical => "Technical",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Style::Professional => "Formal register, precise terminology",
            Style::Casual => "Natural, conversational wording",
            Style::Academic => "Maximum accuracy, domain terms kept",
            Style::Creative => "Free rendering that keeps the spirit of the text",
            Style::Technical => "For documentation, code and IT material",
        }
    }

    pub fn system_prompt(self) -> &'static str {
        match self {
            Style::Professional => {
                "You are an experienced professional translator. Translate in a formal \
                 register and use precise, domain-appropriate terminology."
            }
            Style::Casual => {
                "You are a friendly translator. Translate naturally, the way a native \
                 speaker would say it in everyday conversation."
            }
            Style::Academic => {
                "You are an academic translator. Prioritise accuracy, keep specialised \
                 terms in their established form and do not simplify arguments."
            }
            Style::Creative => {
                "You are a literary translator. Render the text freely and idiomatically \
                 while keeping its meaning, tone and intent."
            }
            Style::Technical => {
                "You are a technical translator. Translate technical terminology exactly \
                 and leave code, commands, identifiers and URLs untouched."
            }
        }
    }

    /// Temperature adopted when the user picks this style.
    pub fn temperature(self) -> f32 {
        match self {
            Style::Professional => 0.3,
            Style::Casual => 0.5,
            Style::Academic => 0.2,
            Style::Creative => 0.7,
            Style::Technical => 0.2,
        }
    }

    /// "💼 Professional"
    pub fn label(self) -> String {
        format!("{} {}", self.emoji(), self.name())
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStyle(pub String);

impl fmt::Display for UnknownStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown translation style '{}'", self.0)
    }
}

impl std::error::Error for UnknownStyle {}

impl FromStr for Style {
    type Err = UnknownStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Style::ALL
            .into_iter()
            .find(|style| style.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStyle(s.to_string()))
    }
}
