//! Status code → lifecycle bucket.

use crate::model::LifecycleBucket;

/// Result of classifying one status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub bucket: LifecycleBucket,
    /// Set when the code was not recognized and the fixture was defaulted
    /// to `Upcoming`.
    pub anomaly: bool,
}

/// Classify a football-data.org status code. Total: unknown codes land in
/// `Upcoming` with `anomaly` set rather than being dropped.
pub fn classify(status: &str) -> Classification {
    let bucket = match status.trim().to_ascii_uppercase().as_str() {
        "FINISHED" | "AWARDED" => LifecycleBucket::Finished,
        "IN_PLAY" | "PAUSED" | "LIVE" | "EXTRA_TIME" | "PENALTY_SHOOTOUT" => LifecycleBucket::Live,
        "SCHEDULED" | "TIMED" | "POSTPONED" => LifecycleBucket::Upcoming,
        _ => {
            return Classification {
                bucket: LifecycleBucket::Upcoming,
                anomaly: true,
            }
        }
    };

    Classification {
        bucket,
        anomaly: false,
    }
}
