//! DVSPortal Client Library
//!
//! Typed async client for the DVSPortal guest-parking reservation API:
//! password login with a cached bearer token, a normalized account snapshot
//! (balance, reservations, known plates) refreshed atomically, and the
//! reservation/plate actions.
//!
//! # Example
//!
//! ```rust,no_run
//! use dvs_client::DvsPortal;
//!
//! #[tokio::main]
//! async fn main() -> dvs_client::Result<()> {
//!     let portal = DvsPortal::new("parking.example.nl", "12345", "secret")?;
//!
//!     // Fetch balance, reservations and known plates
//!     let snapshot = portal.update().await?;
//!     println!("{:?} minutes left", snapshot.balance.balance);
//!
//!     // Reserve guest parking for a plate; defaults come from the snapshot
//!     portal
//!         .create_reservation("AB-123-C", Some("Jan"), None, None, None, None)
//!         .await?;
//!
//!     // Actions do not refresh the cache; do that explicitly
//!     portal.update().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The [`testing`] module provides a mock vendor server:
//!
//! ```rust,ignore
//! use dvs_client::testing::TestServer;
//!
//! let server = TestServer::start().await?;
//! let snapshot = server.client.update().await?;
//! ```

mod client;
mod error;
mod snapshot;
pub mod testing;
mod types;

pub use client::{DvsPortal, PortalConfig};
pub use error::{PortalError, Result};
pub use types::{
    BaseResponse, HistoryItem, LoginRequest, NamedPlate, Permit, PermitMedia, PlateRef,
    VendorReservation,
};

// Re-export the model types the client produces
pub use dvs_core::{ActiveReservation, Balance, HistoricReservation, PortalSnapshot};
