//! Trip model and boundary normalization.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Scheme used by ephemeral on-device file paths. References using it
/// are not valid beyond the originating process lifetime, so they are
/// stripped whenever a trip crosses the sync boundary.
const LOCAL_FILE_SCHEME: &str = "file://";

/// Coordinate pair in the remote contract's shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Coordinate pair in the shape produced by on-device location APIs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DevicePosition {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<DevicePosition> for Coordinates {
    fn from(position: DevicePosition) -> Self {
        Self {
            lat: position.latitude,
            lng: position.longitude,
        }
    }
}

impl From<Coordinates> for DevicePosition {
    fn from(coordinates: Coordinates) -> Self {
        Self {
            latitude: coordinates.lat,
            longitude: coordinates.lng,
        }
    }
}

/// A trip record as exchanged with the remote system and the local cache.
///
/// `id` is absent for not-yet-persisted trips; trips created while
/// offline carry a `local-<timestamp>` placeholder until the queue
/// drain replaces them with the authoritative record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub destination: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    /// Derived from the favorites set on every read; never part of the
    /// remote record.
    #[serde(default, skip_serializing)]
    pub is_favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinates>,
}

impl Trip {
    /// Whether this trip only exists locally (created while offline).
    pub fn is_local_only(&self) -> bool {
        self.id
            .as_deref()
            .is_some_and(|id| id.starts_with("local-"))
    }

    /// Normalize a trip at a boundary crossing: canonical ISO dates and
    /// no ephemeral device file references.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.start_date = normalize_date(&self.start_date);
        self.end_date = normalize_date(&self.end_date);
        self.image = normalize_media_ref(self.image);
        self.photos
            .retain(|photo| !photo.starts_with(LOCAL_FILE_SCHEME));
        self
    }
}

/// Input for creating a trip. Carries the device-shaped location;
/// conversion to the remote `lat`/`lng` shape happens on ingestion.
#[derive(Debug, Clone, Default)]
pub struct NewTrip {
    pub title: String,
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    pub description: String,
    pub image: Option<String>,
    pub photos: Vec<String>,
    pub location: Option<DevicePosition>,
}

impl NewTrip {
    /// Validate display fields and date ordering.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidInput("title must not be empty".to_string()));
        }
        if self.destination.trim().is_empty() {
            return Err(Error::InvalidInput(
                "destination must not be empty".to_string(),
            ));
        }

        let start = normalize_date(&self.start_date);
        let end = normalize_date(&self.end_date);
        // ISO strings order lexicographically; unparseable dates
        // normalize to empty and are accepted fail-soft.
        if !start.is_empty() && !end.is_empty() && end < start {
            return Err(Error::InvalidInput(
                "end date must not be before start date".to_string(),
            ));
        }

        Ok(())
    }

    /// Convert into a remote-shaped trip, normalizing every field.
    #[must_use]
    pub fn into_trip(self) -> Trip {
        Trip {
            id: None,
            title: self.title,
            destination: self.destination,
            start_date: self.start_date,
            end_date: self.end_date,
            description: self.description,
            image: self.image,
            photos: self.photos,
            is_favorite: false,
            location: self.location.map(Coordinates::from),
        }
        .normalized()
    }
}

/// Partial trip update. Absent fields are left untouched and are
/// omitted from the serialized remote payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photos: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinates>,
}

impl TripPatch {
    /// Normalize patched fields the same way full trips are normalized.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.start_date = self.start_date.map(|date| normalize_date(&date));
        self.end_date = self.end_date.map(|date| normalize_date(&date));
        self.image = normalize_media_ref(self.image);
        if let Some(photos) = &mut self.photos {
            photos.retain(|photo| !photo.starts_with(LOCAL_FILE_SCHEME));
        }
        self
    }

    /// Merge this patch into an existing trip.
    pub fn apply_to(&self, trip: &mut Trip) {
        if let Some(title) = &self.title {
            trip.title.clone_from(title);
        }
        if let Some(destination) = &self.destination {
            trip.destination.clone_from(destination);
        }
        if let Some(start_date) = &self.start_date {
            trip.start_date.clone_from(start_date);
        }
        if let Some(end_date) = &self.end_date {
            trip.end_date.clone_from(end_date);
        }
        if let Some(description) = &self.description {
            trip.description.clone_from(description);
        }
        if let Some(image) = &self.image {
            trip.image = Some(image.clone());
        }
        if let Some(photos) = &self.photos {
            trip.photos.clone_from(photos);
        }
        if let Some(location) = self.location {
            trip.location = Some(location);
        }
    }
}

/// Normalize a calendar date into ISO `YYYY-MM-DD`.
///
/// ISO-formatted input passes through unchanged, `DD/MM/YYYY` is
/// reordered (and validated as a real calendar date), and anything else
/// normalizes to the empty string — fail-soft, not fail-fast.
#[must_use]
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    let iso = Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("Invalid regex");
    if iso.is_match(raw) {
        return raw.to_string();
    }

    let day_first = Regex::new(r"^(\d{2})/(\d{2})/(\d{4})$").expect("Invalid regex");
    if let Some(captures) = day_first.captures(raw) {
        let (dd, mm, yyyy) = (&captures[1], &captures[2], &captures[3]);
        let day: u32 = dd.parse().unwrap_or(0);
        let month: u32 = mm.parse().unwrap_or(0);
        let year: i32 = yyyy.parse().unwrap_or(0);
        if NaiveDate::from_ymd_opt(year, month, day).is_some() {
            return format!("{yyyy}-{mm}-{dd}");
        }
    }

    String::new()
}

/// Drop references to ephemeral local device files.
#[must_use]
pub fn normalize_media_ref(reference: Option<String>) -> Option<String> {
    reference.filter(|value| !value.starts_with(LOCAL_FILE_SCHEME))
}
