//! Domain models shared across the sync core.

mod action;
mod trip;

pub use action::{ActionKind, HttpMethod, QueueAction};
pub use trip::{
    normalize_date, normalize_media_ref, Coordinates, DevicePosition, NewTrip, Trip, TripPatch,
};
