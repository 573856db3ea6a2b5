//! Breed hints accepted by the weight model for breed correction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Breed {
    #[default]
    Generic,
    Holstein,
    Angus,
    Hereford,
    Brahman,
    Jersey,
    Simmental,
    Limousin,
    Charolais,
    Bali,
    Ongole,
    Madura,
    PeranakanOngole,
}

impl Breed {
    pub const ALL: [Breed; 13] = [
        Self::Generic,
        Self::Holstein,
        Self::Angus,
        Self::Hereford,
        Self::Brahman,
        Self::Jersey,
        Self::Simmental,
        Self::Limousin,
        Self::Charolais,
        Self::Bali,
        Self::Ongole,
        Self::Madura,
        Self::PeranakanOngole,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Holstein => "holstein",
            Self::Angus => "angus",
            Self::Hereford => "hereford",
            Self::Brahman => "brahman",
            Self::Jersey => "jersey",
            Self::Simmental => "simmental",
            Self::Limousin => "limousin",
            Self::Charolais => "charolais",
            Self::Bali => "bali",
            Self::Ongole => "ongole",
            Self::Madura => "madura",
            Self::PeranakanOngole => "peranakan_ongole",
        }
    }

    /// Resolve a user-supplied hint. Unset or unrecognized input falls back to
    /// [`Breed::Generic`].
    pub fn from_hint(hint: Option<&str>) -> Self {
        match hint.map(str::trim).filter(|h| !h.is_empty()) {
            None => Self::Generic,
            Some(h) => h.parse().unwrap_or_else(|_| {
                tracing::debug!(hint = %h, "unrecognized breed hint, using generic");
                Self::Generic
            }),
        }
    }
}

impl fmt::Display for Breed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown breed: {0}")]
pub struct UnknownBreed(pub String);

impl FromStr for Breed {
    type Err = UnknownBreed;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|b| b.as_str() == normalized)
            .ok_or_else(|| UnknownBreed(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_breeds() {
        assert_eq!("bali".parse::<Breed>(), Ok(Breed::Bali));
        assert_eq!("Peranakan Ongole".parse::<Breed>(), Ok(Breed::PeranakanOngole));
        assert_eq!("peranakan-ongole".parse::<Breed>(), Ok(Breed::PeranakanOngole));
    }

    #[test]
    fn unknown_hint_falls_back_to_generic() {
        assert_eq!(Breed::from_hint(Some("wagyu")), Breed::Generic);
        assert_eq!(Breed::from_hint(Some("  ")), Breed::Generic);
        assert_eq!(Breed::from_hint(None), Breed::Generic);
        assert_eq!(Breed::from_hint(Some("Angus")), Breed::Angus);
    }

    #[test]
    fn as_str_matches_serde() {
        for breed in Breed::ALL {
            let json = serde_json::to_string(&breed).unwrap();
            assert_eq!(json, format!("\"{}\"", breed.as_str()));
        }
    }
}
