use std::fmt;
use std::str::FromStr;

use crate::error::ScanError;

/// How the source and destination trees are reconciled.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Mode {
    /// Copy new or updated files from source to destination.
    #[default]
    Update,
    /// As [`Mode::Update`], then delete destination entries the source lacks.
    Mirror,
    /// Bidirectional: newer files win in either direction; nothing is deleted.
    Sync,
}

impl Mode {
    /// Parses a mode name, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::UnknownMode`] for anything other than
    /// `update`, `mirror`, or `sync`.
    pub fn parse(name: &str) -> Result<Self, ScanError> {
        match name.to_ascii_lowercase().as_str() {
            "update" => Ok(Self::Update),
            "mirror" => Ok(Self::Mirror),
            "sync" => Ok(Self::Sync),
            _ => Err(ScanError::UnknownMode(name.to_owned())),
        }
    }

    /// Canonical lowercase name of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Mirror => "mirror",
            Self::Sync => "sync",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_names_case_insensitively() {
        assert_eq!(Mode::parse("update").unwrap(), Mode::Update);
        assert_eq!(Mode::parse("MIRROR").unwrap(), Mode::Mirror);
        assert_eq!(Mode::parse("Sync").unwrap(), Mode::Sync);
    }

    #[test]
    fn rejects_unknown_names() {
        let err = Mode::parse("replicate").unwrap_err();
        assert!(matches!(err, ScanError::UnknownMode(name) if name == "replicate"));
    }

    #[test]
    fn from_str_round_trips_display() {
        for mode in [Mode::Update, Mode::Mirror, Mode::Sync] {
            assert_eq!(mode.to_string().parse::<Mode>().unwrap(), mode);
        }
    }
}
