//! Watkins Marine Mammal Sound Database helpers
//!
//! Structured-metadata captions and the recording-artifact heuristic used by
//! the second caption pass.

use regex::Regex;
use std::sync::LazyLock;

static COORDINATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"[NS]\d{1,3}°\s?\d{1,3}'\s?[EW]",
        r"\d{1,3}°\d{1,3}'[NS],\s?\d{1,3}°\d{1,3}'[EW]",
        r"coordinates",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid coordinate regex"))
    .collect()
});

/// Case-sensitive substrings left behind by catalogue notes
const ARTIFACT_KEYWORDS: [&str; 10] = [
    "CD",
    "tape",
    "session",
    "hydrophone #",
    "cut",
    "West",
    "North",
    "East",
    "at location",
    "recorded at",
];

/// Watkins signal-type codes
pub fn expand_signal_type(code: &str) -> Option<&'static str> {
    match code.trim() {
        "BL" => Some("broadband long signals"),
        "BS" => Some("broadband short signals"),
        "NL" => Some("narrowband long signals"),
        "NS" => Some("narrowband short signals"),
        "FM" => Some("frequency modulated signals"),
        "CH" => Some("chirp signals"),
        "PU" => Some("pulsed signals"),
        "SE" => Some("series of sounds"),
        "SO" => Some("song signals"),
        _ => None,
    }
}

/// Fields of one Watkins catalogue entry fed to the structured prompt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatkinsMetadata {
    pub species: String,
    pub genus_species: String,
    /// Raw signal-type code (`BL`, `FM`, ...)
    pub signal_type: String,
    pub behavior: String,
    pub num_animals: String,
    pub notes: String,
}

impl WatkinsMetadata {
    /// Primary species of a `genus_species` cell, without its catalogue code
    ///
    /// `"Orcinus orca  BE7A | Ambient  X"` becomes `"Orcinus orca"`.
    pub fn primary_genus_species(&self) -> String {
        let first = self.genus_species.split(" | ").next().unwrap_or("");
        let words: Vec<&str> = first.split_whitespace().collect();
        let keep = match words.last() {
            Some(last) if words.len() > 1 && is_catalogue_code(last) => words.len() - 1,
            _ => words.len(),
        };
        words[..keep].join(" ")
    }

    /// Signal type as words; unknown codes pass through unchanged
    pub fn signal_type_text(&self) -> String {
        expand_signal_type(&self.signal_type)
            .map(str::to_string)
            .unwrap_or_else(|| self.signal_type.trim().to_string())
    }
}

fn is_catalogue_code(word: &str) -> bool {
    word.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && word.chars().any(|c| c.is_ascii_digit())
        && word.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// Whether a caption carries coordinates or recording-session artifacts
pub fn needs_recaption(text: &str) -> bool {
    if let Some(pattern) = COORDINATE_PATTERNS.iter().find(|re| re.is_match(text)) {
        tracing::debug!(pattern = pattern.as_str(), "Coordinates found");
        return true;
    }

    if let Some(keyword) = ARTIFACT_KEYWORDS.iter().find(|k| text.contains(*k)) {
        tracing::debug!(keyword, "Recording artifact keyword found");
        return true;
    }

    false
}
