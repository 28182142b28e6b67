//! Research depth tiers and their length profiles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Caller-selected verbosity tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    Quick,
    #[default]
    Detailed,
    Academic,
}

/// Length and tone guidance for one depth tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthProfile {
    pub length_guidance: &'static str,
    pub min_words: u32,
    pub max_words: u32,
    pub tone: &'static str,
}

const QUICK: DepthProfile = DepthProfile {
    length_guidance: "a short answer of two or three sentences",
    min_words: 50,
    max_words: 100,
    tone: "plain and direct, suitable for a busy reader",
};

const DETAILED: DepthProfile = DepthProfile {
    length_guidance: "three to five well-developed paragraphs",
    min_words: 200,
    max_words: 400,
    tone: "informative and neutral, explaining key mechanisms and context",
};

const ACADEMIC: DepthProfile = DepthProfile {
    length_guidance: "a structured academic overview covering background, current understanding, and open questions",
    min_words: 400,
    max_words: 700,
    tone: "formal and precise, with careful attribution of claims to sources",
};

impl Depth {
    pub const ALL: [Depth; 3] = [Depth::Quick, Depth::Detailed, Depth::Academic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Depth::Quick => "quick",
            Depth::Detailed => "detailed",
            Depth::Academic => "academic",
        }
    }

    pub fn profile(&self) -> &'static DepthProfile {
        match self {
            Depth::Quick => &QUICK,
            Depth::Detailed => &DETAILED,
            Depth::Academic => &ACADEMIC,
        }
    }

    /// Parse a caller-supplied depth, falling back to `Detailed` for
    /// anything unrecognised.
    pub fn parse_or_default(value: Option<&str>) -> Depth {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Depth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quick" => Ok(Depth::Quick),
            "detailed" => Ok(Depth::Detailed),
            "academic" => Ok(Depth::Academic),
            other => Err(format!("unknown depth '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_default() {
        assert_eq!(Depth::parse_or_default(Some("quick")), Depth::Quick);
        assert_eq!(Depth::parse_or_default(Some(" Academic ")), Depth::Academic);
        assert_eq!(Depth::parse_or_default(Some("exhaustive")), Depth::Detailed);
        assert_eq!(Depth::parse_or_default(Some("")), Depth::Detailed);
        assert_eq!(Depth::parse_or_default(None), Depth::Detailed);
    }

    #[test]
    fn test_profiles_grow_with_depth() {
        let words: Vec<(u32, u32)> = Depth::ALL
            .iter()
            .map(|d| (d.profile().min_words, d.profile().max_words))
            .collect();
        for pair in words.windows(2) {
            assert!(pair[0].1 <= pair[1].0);
        }
        for (min, max) in words {
            assert!(min < max);
        }
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Depth::Quick).unwrap(), "\"quick\"");
        let depth: Depth = serde_json::from_str("\"academic\"").unwrap();
        assert_eq!(depth, Depth::Academic);
        assert_eq!(Depth::Detailed.to_string(), "detailed");
    }
}
