//! Summary modes and their prompt templates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Style of summary to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMode {
    /// General abstractive summary in paragraph form
    #[default]
    Prose,
    /// Bullet-point summary
    Bullet,
    /// Extractive summary (key sentences)
    Extractive,
}

impl SummaryMode {
    /// All modes, in the order they are offered to users.
    pub const ALL: [SummaryMode; 3] = [Self::Prose, Self::Bullet, Self::Extractive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prose => "prose",
            Self::Bullet => "bullet",
            Self::Extractive => "extractive",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Prose => "General abstractive summary in paragraph form",
            Self::Bullet => "Bullet-point summary",
            Self::Extractive => "Extractive summary (key sentences)",
        }
    }

    /// File name of the mode's template inside a templates directory.
    pub fn template_file(&self) -> &'static str {
        match self {
            Self::Prose => "prompt_template.txt",
            Self::Bullet => "bullet_summary_template.txt",
            Self::Extractive => "extractive_summary_template.txt",
        }
    }
}

impl fmt::Display for SummaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported mode {0}. Choose from [prose, bullet, extractive]")]
pub struct UnknownMode(pub String);

impl FromStr for SummaryMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| UnknownMode(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modes() {
        assert_eq!("prose".parse::<SummaryMode>().unwrap(), SummaryMode::Prose);
        assert_eq!(" Bullet ".parse::<SummaryMode>().unwrap(), SummaryMode::Bullet);
        assert_eq!(
            "EXTRACTIVE".parse::<SummaryMode>().unwrap(),
            SummaryMode::Extractive
        );
    }

    #[test]
    fn test_unknown_mode_lists_choices() {
        let err = "haiku".parse::<SummaryMode>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported mode haiku. Choose from [prose, bullet, extractive]"
        );
    }

    #[test]
    fn test_order_and_default() {
        assert_eq!(SummaryMode::ALL[0], SummaryMode::default());
        let names: Vec<_> = SummaryMode::ALL.iter().map(|m| m.as_str()).collect();
        assert_eq!(names, vec!["prose", "bullet", "extractive"]);
    }
}
