pub mod models {
    pub mod usage;
}

pub mod dto {
    pub mod usage;
}

pub mod error;

// Re-export commonly used items
pub use error::{Result, SharedError};

pub use models::usage::{BucketWidth, Series, TimePoint, UsageTimeSeries};

pub use dto::usage::{PaginationMeta, UsageEvent, UsagePage, UsageQuery};

/// Parses an IANA timezone name, e.g. `"Europe/London"`
pub fn parse_timezone(name: &str) -> Result<chrono_tz::Tz> {
    name.parse::<chrono_tz::Tz>()
        .map_err(|_| SharedError::InvalidTimezone(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone("Europe/London").unwrap(), chrono_tz::Europe::London);
        assert_eq!(
            parse_timezone("Mars/Olympus"),
            Err(SharedError::InvalidTimezone("Mars/Olympus".to_string()))
        );
    }

    #[test]
    fn test_json_error_converts_to_conversion() {
        let err: SharedError = serde_json::from_str::<UsagePage>("{").unwrap_err().into();
        assert!(matches!(err, SharedError::Conversion(_)));
    }
}
