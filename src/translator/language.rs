//! Supported target languages.

/// A translation target.
#[derive(Debug, PartialEq, Eq)]
pub struct Language {
    /// ISO 639-1 code, used in the database and callback data.
    pub code: &'static str,
    pub flag: &'static str,
    /// Native name, also what the model is asked to translate into.
    pub name: &'static str,
}

const LANGUAGES: &[Language] = &[
    Language { code: "vi", flag: "🇻🇳", name: "Tiếng Việt" },
    Language { code: "en", flag: "🇬🇧", name: "English" },
    Language { code: "zh", flag: "🇨🇳", name: "中文" },
    Language { code: "ja", flag: "🇯🇵", name: "日本語" },
    Language { code: "ko", flag: "🇰🇷", name: "한국어" },
    Language { code: "fr", flag: "🇫🇷", name: "Français" },
    Language { code: "de", flag: "🇩🇪", name: "Deutsch" },
    Language { code: "es", flag: "🇪🇸", name: "Español" },
    Language { code: "ru", flag: "🇷🇺", name: "Русский" },
    Language { code: "th", flag: "🇹🇭", name: "ไทย" },
];

impl Language {
    pub fn all() -> &'static [Language] {
        LANGUAGES
    }

    /// Look up a language by code (case-insensitive).
    pub fn from_code(code: &str) -> Option<&'static Language> {
        let code = code.trim();
        LANGUAGES.iter().find(|l| l.code.eq_ignore_ascii_case(code))
    }

    /// "🇬🇧 English"
    pub fn label(&self) -> String {
        format!("{} {}", self.flag, self.name)
    }
}
