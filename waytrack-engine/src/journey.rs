//! Validated journey descriptors.
//!
//! A [`Journey`] is static trip metadata supplied by the booking side. It is
//! checked once on construction and never mutated afterwards; a changed trip
//! is a new journey.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::MIN_ROUTE_LEN;
use crate::geo::normalize_city;

/// Reasons a journey descriptor is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JourneyError {
    #[error("journey id must not be blank")]
    BlankId,
    #[error("{field} city must not be blank")]
    BlankCity { field: &'static str },
    #[error("route needs at least 2 stops, got {len}")]
    RouteTooShort { len: usize },
    #[error("route must start at {expected:?}, found {found:?}")]
    SourceMismatch { expected: String, found: String },
    #[error("route must end at {expected:?}, found {found:?}")]
    DestinationMismatch { expected: String, found: String },
    #[error("route repeats {city:?} at positions {index} and {}", .index + 1)]
    DuplicateAdjacent { city: String, index: usize },
    #[error("arrival {arrival} must be after departure {departure}")]
    InvalidTiming {
        departure: DateTime<Utc>,
        arrival: DateTime<Utc>,
    },
    #[error("malformed journey descriptor: {0}")]
    Malformed(String),
}

/// Wire form of a journey as delivered by the booking API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JourneyDescriptor {
    id: String,
    source: String,
    destination: String,
    #[serde(default)]
    route: Option<Vec<String>>,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
}

impl TryFrom<JourneyDescriptor> for Journey {
    type Error = JourneyError;

    fn try_from(raw: JourneyDescriptor) -> Result<Self, Self::Error> {
        let route = raw
            .route
            .unwrap_or_else(|| vec![raw.source.clone(), raw.destination.clone()]);
        Self::new(
            raw.id,
            raw.source,
            raw.destination,
            route,
            raw.departure_time,
            raw.arrival_time,
        )
    }
}

/// One scheduled point-to-point trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "JourneyDescriptor")]
pub struct Journey {
    id: String,
    source: String,
    destination: String,
    route: Vec<String>,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
}

impl Journey {
    /// Build a journey, enforcing every descriptor invariant.
    ///
    /// City names are trimmed. Endpoint and adjacency checks ignore case and
    /// repeated whitespace.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        destination: impl Into<String>,
        route: Vec<String>,
        departure_time: DateTime<Utc>,
        arrival_time: DateTime<Utc>,
    ) -> Result<Self, JourneyError> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(JourneyError::BlankId);
        }
        let source = non_blank(source.into(), "source")?;
        let destination = non_blank(destination.into(), "destination")?;
        let route = route
            .into_iter()
            .map(|city| non_blank(city, "route"))
            .collect::<Result<Vec<_>, _>>()?;

        if route.len() < MIN_ROUTE_LEN {
            return Err(JourneyError::RouteTooShort { len: route.len() });
        }
        if let Some(first) = route.first()
            && normalize_city(first) != normalize_city(&source)
        {
            return Err(JourneyError::SourceMismatch {
                expected: source,
                found: first.clone(),
            });
        }
        if let Some(last) = route.last()
            && normalize_city(last) != normalize_city(&destination)
        {
            return Err(JourneyError::DestinationMismatch {
                expected: destination,
                found: last.clone(),
            });
        }
        if let Some(index) = route
            .windows(2)
            .position(|pair| normalize_city(&pair[0]) == normalize_city(&pair[1]))
        {
            return Err(JourneyError::DuplicateAdjacent {
                city: route[index].clone(),
                index,
            });
        }
        if arrival_time <= departure_time {
            return Err(JourneyError::InvalidTiming {
                departure: departure_time,
                arrival: arrival_time,
            });
        }

        Ok(Self {
            id,
            source,
            destination,
            route,
            departure_time,
            arrival_time,
        })
    }

    /// Parse and validate a camelCase journey descriptor.
    ///
    /// A descriptor without `route` travels directly from source to destination.
    ///
    /// # Errors
    ///
    /// Returns [`JourneyError::Malformed`] for unparsable JSON and the
    /// violated invariant otherwise.
    pub fn from_json(json: &str) -> Result<Self, JourneyError> {
        let raw: JourneyDescriptor =
            serde_json::from_str(json).map_err(|err| JourneyError::Malformed(err.to_string()))?;
        Self::try_from(raw)
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Ordered stop names, endpoints included.
    #[must_use]
    pub fn route(&self) -> &[String] {
        &self.route
    }

    #[must_use]
    pub const fn departure_time(&self) -> DateTime<Utc> {
        self.departure_time
    }

    #[must_use]
    pub const fn arrival_time(&self) -> DateTime<Utc> {
        self.arrival_time
    }

    /// Scheduled span between departure and arrival; always positive.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.arrival_time - self.departure_time
    }
}

fn non_blank(value: String, field: &'static str) -> Result<String, JourneyError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(JourneyError::BlankCity { field })
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, h, m, 0).unwrap()
    }

    fn route(cities: &[&str]) -> Vec<String> {
        cities.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn accepts_a_well_formed_journey() {
        let journey = Journey::new(
            " trip-1 ",
            "Dhaka",
            "Cox's Bazar",
            route(&["Dhaka", "Comilla", "Feni", "Chittagong", "Cox's Bazar"]),
            at(8, 0),
            at(14, 30),
        )
        .unwrap();
        assert_eq!(journey.id(), "trip-1");
        assert_eq!(journey.route().len(), 5);
        assert_eq!(journey.duration(), Duration::minutes(390));
    }

    #[test]
    fn rejects_each_broken_invariant() {
        let ok = route(&["Dhaka", "Feni"]);
        assert_eq!(
            Journey::new("", "Dhaka", "Feni", ok.clone(), at(8, 0), at(9, 0)),
            Err(JourneyError::BlankId)
        );
        assert_eq!(
            Journey::new("j", "Dhaka", "Feni", route(&["Dhaka"]), at(8, 0), at(9, 0)),
            Err(JourneyError::RouteTooShort { len: 1 })
        );
        assert!(matches!(
            Journey::new("j", "Sylhet", "Feni", ok.clone(), at(8, 0), at(9, 0)),
            Err(JourneyError::SourceMismatch { .. })
        ));
        assert!(matches!(
            Journey::new("j", "Dhaka", "Sylhet", ok.clone(), at(8, 0), at(9, 0)),
            Err(JourneyError::DestinationMismatch { .. })
        ));
        assert_eq!(
            Journey::new(
                "j",
                "Dhaka",
                "Feni",
                route(&["Dhaka", "dhaka ", "Feni"]),
                at(8, 0),
                at(9, 0)
            ),
            Err(JourneyError::DuplicateAdjacent {
                city: "Dhaka".to_string(),
                index: 0
            })
        );
        assert!(matches!(
            Journey::new("j", "Dhaka", "Feni", ok.clone(), at(9, 0), at(9, 0)),
            Err(JourneyError::InvalidTiming { .. })
        ));
        assert_eq!(
            Journey::new("j", "  ", "Feni", ok, at(8, 0), at(9, 0)),
            Err(JourneyError::BlankCity { field: "source" })
        );
    }

    #[test]
    fn parses_camel_case_descriptor_with_default_route() {
        let journey = Journey::from_json(
            r#"{
                "id": "bk-77",
                "source": "Dhaka",
                "destination": "Sylhet",
                "departureTime": "2024-06-01T08:00:00Z",
                "arrivalTime": "2024-06-01T13:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(journey.route(), &["Dhaka".to_string(), "Sylhet".to_string()]);
        assert_eq!(journey.departure_time(), at(8, 0));
    }

    #[test]
    fn descriptor_validation_runs_through_serde() {
        let err = Journey::from_json(
            r#"{
                "id": "bk-78",
                "source": "Dhaka",
                "destination": "Sylhet",
                "departureTime": "2024-06-01T13:00:00Z",
                "arrivalTime": "2024-06-01T08:00:00Z"
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, JourneyError::InvalidTiming { .. }));

        let garbage = Journey::from_json("{ not json").unwrap_err();
        assert!(matches!(garbage, JourneyError::Malformed(_)));
    }

    #[test]
    fn serializes_back_to_camel_case() {
        let journey = Journey::new(
            "j",
            "Dhaka",
            "Feni",
            route(&["Dhaka", "Feni"]),
            at(8, 0),
            at(9, 0),
        )
        .unwrap();
        let value = serde_json::to_value(&journey).unwrap();
        assert_eq!(value["departureTime"], "2024-06-01T08:00:00Z");
        let back: Journey = serde_json::from_value(value).unwrap();
        assert_eq!(back, journey);
    }
}
