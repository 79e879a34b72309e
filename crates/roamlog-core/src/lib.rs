//! roamlog-core - Core library for Roamlog
//!
//! This crate contains the offline-first data layer shared by all
//! Roamlog hosts: trip models, the durable key-value store backing the
//! local cache and the offline action queue, connectivity probing, the
//! remote HTTP client, the sync coordinator that drains queued
//! mutations, and the trip service facade that UI code talks to.

// Collaborator traits are consumed through generics, never trait objects.
#![allow(async_fn_in_trait)]

pub mod cache;
pub mod connectivity;
pub mod error;
pub mod favorites;
pub mod models;
pub mod queue;
pub mod remote;
pub mod service;
pub mod storage;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{NewTrip, QueueAction, Trip, TripPatch};
pub use service::TripService;
pub use sync::{SyncCoordinator, SyncReport};
