//! Normalized snapshot of a DVSPortal account

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp format used by the vendor for reservation validity windows.
///
/// Reservation timestamps are kept as vendor-formatted strings in the
/// snapshot and only parsed when a view consumes them.
pub const VENDOR_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse a vendor-formatted timestamp, `None` if absent or malformed.
pub fn parse_vendor_timestamp(value: Option<&str>) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value?, VENDOR_TIMESTAMP_FORMAT).ok()
}

/// Guest-parking credit balance of the active permit medium
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    /// Remaining balance in minutes
    pub balance: Option<f64>,
    pub remaining_upgrades: Option<i64>,
    pub remaining_downgrades: Option<i64>,
}

/// A reservation that is currently active or scheduled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveReservation {
    pub reservation_id: Option<i64>,
    /// Vendor-formatted timestamp string, see [`VENDOR_TIMESTAMP_FORMAT`]
    pub valid_from: Option<String>,
    /// Vendor-formatted timestamp string, see [`VENDOR_TIMESTAMP_FORMAT`]
    pub valid_until: Option<String>,
    pub license_plate: String,
    pub units: Option<i64>,
    /// `units * unit_price`; `None` when either side is unknown, never a
    /// fabricated zero
    pub cost: Option<f64>,
}

/// The most recent historic reservation for a license plate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricReservation {
    pub reservation_id: Option<i64>,
    pub valid_from: Option<String>,
    pub valid_until: Option<String>,
    pub units: Option<i64>,
}

/// Fully normalized account state, replaced wholesale on every successful
/// refresh.
///
/// The snapshot is never patched incrementally: the client stages a fresh
/// one from the vendor payload and commits it in a single assignment, so a
/// failed refresh leaves the previous snapshot intact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortalSnapshot {
    pub balance: Balance,
    /// Price of one reservation unit, from the permit
    pub unit_price: Option<f64>,
    /// Permit-media type used as default for actions
    pub default_type_id: Option<i64>,
    /// Permit-media code used as default for actions
    pub default_code: Option<String>,
    /// Active reservations keyed by license-plate value
    pub active_reservations: HashMap<String, ActiveReservation>,
    /// Most recent historic reservation per display plate
    pub historic_reservations: HashMap<String, HistoricReservation>,
    /// Every plate the account knows about, mapped to its display name.
    ///
    /// Merged from three sources with increasing precedence: historic
    /// reservations (unnamed), active reservations (unnamed), explicit
    /// plate records (named). A name therefore always survives the merge.
    pub known_license_plates: HashMap<String, Option<String>>,
}

impl PortalSnapshot {
    /// Display name for a plate, if the account has one on record.
    pub fn plate_name(&self, plate: &str) -> Option<&str> {
        self.known_license_plates.get(plate)?.as_deref()
    }

    /// Whether the plate has a reservation valid at `now`.
    pub fn plate_present(&self, plate: &str, now: NaiveDateTime) -> bool {
        self.active_reservations
            .get(plate)
            .map(|r| reservation_is_current(r, now))
            .unwrap_or(false)
    }
}

/// A reservation is current when `valid_from <= now < valid_until`.
///
/// Missing or malformed timestamps make the reservation non-current; it
/// still counts as scheduled (future) in the summary view.
pub(crate) fn reservation_is_current(reservation: &ActiveReservation, now: NaiveDateTime) -> bool {
    let from = parse_vendor_timestamp(reservation.valid_from.as_deref());
    let until = parse_vendor_timestamp(reservation.valid_until.as_deref());
    match (from, until) {
        (Some(from), Some(until)) => from <= now && until > now,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, VENDOR_TIMESTAMP_FORMAT).unwrap()
    }

    fn reservation(from: Option<&str>, until: Option<&str>) -> ActiveReservation {
        ActiveReservation {
            reservation_id: Some(1),
            valid_from: from.map(String::from),
            valid_until: until.map(String::from),
            license_plate: "AB-123-C".to_string(),
            units: Some(60),
            cost: None,
        }
    }

    #[test]
    fn parses_vendor_timestamps() {
        assert_eq!(
            parse_vendor_timestamp(Some("2024-05-01T13:30:00")),
            Some(ts("2024-05-01T13:30:00"))
        );
        assert_eq!(parse_vendor_timestamp(Some("01-05-2024 13:30")), None);
        assert_eq!(parse_vendor_timestamp(None), None);
    }

    #[test]
    fn current_reservation_window() {
        let now = ts("2024-05-01T12:00:00");
        let r = reservation(Some("2024-05-01T11:00:00"), Some("2024-05-01T13:00:00"));
        assert!(reservation_is_current(&r, now));

        let future = reservation(Some("2024-05-01T13:00:00"), Some("2024-05-01T15:00:00"));
        assert!(!reservation_is_current(&future, now));

        let expired = reservation(Some("2024-05-01T09:00:00"), Some("2024-05-01T10:00:00"));
        assert!(!reservation_is_current(&expired, now));
    }

    #[test]
    fn malformed_timestamps_are_not_current() {
        let now = ts("2024-05-01T12:00:00");
        assert!(!reservation_is_current(&reservation(None, None), now));
        assert!(!reservation_is_current(
            &reservation(Some("yesterday"), Some("tomorrow")),
            now
        ));
    }

    #[test]
    fn plate_presence_uses_active_reservations() {
        let now = ts("2024-05-01T12:00:00");
        let mut snapshot = PortalSnapshot::default();
        snapshot.active_reservations.insert(
            "AB-123-C".to_string(),
            reservation(Some("2024-05-01T11:00:00"), Some("2024-05-01T13:00:00")),
        );
        assert!(snapshot.plate_present("AB-123-C", now));
        assert!(!snapshot.plate_present("ZZ-999-Z", now));
    }
}
