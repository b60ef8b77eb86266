use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rand::Rng;
use tracing::{debug, warn};

use crate::errors::ServiceError;
use crate::store::RequestStore;

const MAX_ATTEMPTS: usize = 10;
const SERIAL_SPACE: usize = 10_000;

/// How the four-digit serial of a request number is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SerialStrategy {
    /// Uniform over 0..=9999.
    #[default]
    Random,
    /// Number of known requests plus one.
    Sequential,
}

/// Parsed `MRF-YYMM-NNNN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestNumber {
    pub year: u32,
    pub month: u32,
    pub serial: u32,
}

impl FromStr for RequestNumber {
    type Err = ServiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ServiceError::ValidationError(format!("invalid request number '{}'", value));
        let rest = value.strip_prefix("MRF-").ok_or_else(invalid)?;
        let (period, serial) = rest.split_once('-').ok_or_else(invalid)?;
        if period.len() != 4 || serial.len() != 4 {
            return Err(invalid());
        }
        if !period.bytes().chain(serial.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let year = period[..2].parse().map_err(|_| invalid())?;
        let month: u32 = period[2..].parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Self {
            year,
            month,
            serial: serial.parse().map_err(|_| invalid())?,
        })
    }
}

/// Formats `MRF-YYMM-NNNN`.
pub fn format_number(date: NaiveDate, serial: usize) -> String {
    format!(
        "MRF-{:02}{:02}-{:04}",
        date.year().rem_euclid(100),
        date.month(),
        serial % SERIAL_SPACE
    )
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestNumbering {
    strategy: SerialStrategy,
}

impl RequestNumbering {
    pub fn new(strategy: SerialStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> SerialStrategy {
        self.strategy
    }

    /// Candidate number for the given attempt.
    pub fn candidate(&self, date: NaiveDate, known_requests: usize, attempt: usize) -> String {
        let serial = match self.strategy {
            SerialStrategy::Random => rand::thread_rng().gen_range(0..SERIAL_SPACE),
            SerialStrategy::Sequential => known_requests + 1 + attempt,
        };
        format_number(date, serial)
    }

    /// Picks a number not already present in the store.
    pub async fn assign(&self, store: &RequestStore, date: NaiveDate) -> Result<String, ServiceError> {
        let known = store.request_count().await;
        for attempt in 0..MAX_ATTEMPTS {
            let candidate = self.candidate(date, known, attempt);
            if !store.contains_number(&candidate).await {
                debug!(mrf_number = %candidate, attempt, "request number assigned");
                return Ok(candidate);
            }
            warn!(mrf_number = %candidate, attempt, "request number collision");
        }
        Err(ServiceError::Conflict(format!(
            "could not allocate a unique request number after {} attempts",
            MAX_ATTEMPTS
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::models::{MaterialRequest, RequestStatus};
    use std::sync::Arc;
    use uuid::Uuid;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 5).unwrap()
    }

    fn stored(number: String) -> MaterialRequest {
        MaterialRequest {
            id: Uuid::new_v4(),
            request_date: date(),
            mrf_number: number,
            engineer_name: "E".into(),
            project_name: "P".into(),
            site_location: "S".into(),
            department: "Hardware".into(),
            status: RequestStatus::Pending,
            materials: Vec::new(),
        }
    }

    #[test]
    fn format_is_year_month_serial() {
        assert_eq!(format_number(date(), 42), "MRF-2508-0042");
        assert_eq!(format_number(date(), 10_003), "MRF-2508-0003");
    }

    #[test]
    fn random_candidates_parse_back() {
        let numbering = RequestNumbering::new(SerialStrategy::Random);
        for _ in 0..50 {
            let number: RequestNumber = numbering.candidate(date(), 0, 0).parse().unwrap();
            assert_eq!((number.year, number.month), (25, 8));
            assert!(number.serial <= 9999);
        }
    }

    #[test]
    fn sequential_follows_count() {
        let numbering = RequestNumbering::new(SerialStrategy::Sequential);
        assert_eq!(numbering.candidate(date(), 6, 0), "MRF-2508-0007");
        assert_eq!(numbering.candidate(date(), 6, 2), "MRF-2508-0009");
    }

    #[test]
    fn parse_rejects_malformed_numbers() {
        assert!("MRF-2508-00a1".parse::<RequestNumber>().is_err());
        assert!("MRF-2513-0001".parse::<RequestNumber>().is_err());
        assert!("PO-2508-0001".parse::<RequestNumber>().is_err());
        assert!("MRF-25080-001".parse::<RequestNumber>().is_err());
    }

    #[test]
    fn strategy_parses_from_config_text() {
        assert_eq!("Sequential".parse::<SerialStrategy>().unwrap(), SerialStrategy::Sequential);
        assert_eq!("random".parse::<SerialStrategy>().unwrap(), SerialStrategy::Random);
        assert!("hourly".parse::<SerialStrategy>().is_err());
    }

    #[tokio::test]
    async fn sequential_skips_taken_numbers() {
        let backend = Arc::new(InMemoryBackend::with_data(
            vec![stored("MRF-2508-0002".into())],
            Vec::new(),
        ));
        let store = RequestStore::new(backend);
        store.load().await.unwrap();

        let numbering = RequestNumbering::new(SerialStrategy::Sequential);
        assert_eq!(numbering.assign(&store, date()).await.unwrap(), "MRF-2508-0003");
    }

    #[tokio::test]
    async fn gives_up_after_repeated_collisions() {
        // Ten stored requests holding serials 11..=20: every sequential
        // candidate collides.
        let taken: Vec<_> = (11..=20).map(|n| stored(format_number(date(), n))).collect();
        let backend = Arc::new(InMemoryBackend::with_data(taken, Vec::new()));
        let store = RequestStore::new(backend);
        store.load().await.unwrap();

        let numbering = RequestNumbering::new(SerialStrategy::Sequential);
        assert!(matches!(
            numbering.assign(&store, date()).await,
            Err(ServiceError::Conflict(_))
        ));
    }
}
