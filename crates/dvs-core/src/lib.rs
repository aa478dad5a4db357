//! dvs-core - Canonical data model for the DVSPortal guest-parking API
//!
//! This crate holds the normalized account snapshot produced by the client
//! and the derived views consumed by poll coordinators and front-ends. It is
//! independent of any HTTP or host-framework concern.

pub mod model;
pub mod views;

pub use model::{
    parse_vendor_timestamp, ActiveReservation, Balance, HistoricReservation, PortalSnapshot,
    VENDOR_TIMESTAMP_FORMAT,
};
pub use views::{
    compute_views, BalanceView, EntityView, PlatePresence, ReservationsSummary,
};
