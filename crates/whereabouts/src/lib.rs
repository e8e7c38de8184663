//! `whereabouts` - Capture, persist and inspect location fixes
//!
//! This library wraps a host location service behind [`LocationCapture`],
//! keeps every successful fix in a [`LocationStore`] layered over host local
//! storage, and collects a [`DeviceProfile`] of everything the host reveals
//! about itself.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod capture;
pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod location;
pub mod logging;
pub mod profile;
pub mod simulator;
pub mod storage;

pub use capture::{CaptureResult, LocationCapture, WatchSubscription};
pub use config::Config;
pub use error::{Error, LocationError, Result};
pub use host::{GeolocationHost, HostPosition, HostPositionError, PositionOptions, WatchId};
pub use location::{EnvironmentSnapshot, LocationRecord};
pub use logging::init_logging;
pub use profile::{DeviceProfile, DeviceProfiler, IntrospectionHost, NativeHost};
pub use simulator::SimulatedGeolocation;
pub use storage::{KeyValueStore, LocationStore, SqliteKeyValue, StoreStats, StoredLocationEntry};
