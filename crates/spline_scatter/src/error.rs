//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Variants cover
//! invalid configuration, placeables that would cause recursive respawning, respawn requests
//! that collide with an in-flight pass, unknown segments, and worker pool setup failures.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "placeable '{name}' carries {count} mask rule(s); spawning it could retrigger respawning indefinitely"
    )]
    PlaceableContainsMasks { name: String, count: usize },

    #[error("segment {segment} still has a respawn pass in flight")]
    PassInFlight { segment: usize },

    #[error("unknown segment {segment}")]
    UnknownSegment { segment: usize },

    #[error("worker pool: {0}")]
    ThreadPool(String),

    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Other(value.to_owned())
    }
}

impl From<rayon::ThreadPoolBuildError> for Error {
    fn from(value: rayon::ThreadPoolBuildError) -> Self {
        Error::ThreadPool(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_string_uses_other_variant() {
        let err: Error = String::from("boom").into();
        matches!(err, Error::Other(_))
            .then_some(())
            .expect("expected Other variant");
    }

    #[test]
    fn masked_placeable_message_names_the_placeable() {
        let err = Error::PlaceableContainsMasks {
            name: "rock".into(),
            count: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("rock"));
        assert!(msg.contains('2'));
    }

    #[test]
    fn in_flight_reports_segment() {
        let err = Error::PassInFlight { segment: 3 };
        assert_eq!(err.to_string(), "segment 3 still has a respawn pass in flight");
    }
}
