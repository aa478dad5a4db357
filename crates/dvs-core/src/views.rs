//! Derived views over a portal snapshot
//!
//! Each view corresponds to one sensor a consumer would surface: the credit
//! balance, a summary of active/scheduled reservations, and one presence
//! flag per known plate. Views are pure functions of a snapshot and a
//! caller-supplied `now`, so they are deterministic and trivially testable.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::model::{reservation_is_current, PortalSnapshot};

/// Tagged view variants, one per derived sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityView {
    Balance(BalanceView),
    Reservations(ReservationsSummary),
    Plate(PlatePresence),
}

/// Credit balance of the account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceView {
    /// Remaining guest-parking minutes
    pub minutes: Option<f64>,
    pub remaining_upgrades: Option<i64>,
    pub remaining_downgrades: Option<i64>,
}

/// Summary of all reservations on the active permit medium
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReservationsSummary {
    /// Total reservations, active and scheduled
    pub total: usize,
    /// Plates with a reservation valid right now
    pub active_plates: Vec<String>,
    /// Plates with a reservation outside the current window (scheduled, or
    /// with an unparseable validity window)
    pub future_plates: Vec<String>,
}

/// Presence of a single known plate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatePresence {
    pub plate: String,
    pub name: Option<String>,
    /// Whether the plate has a reservation valid at the queried time
    pub present: bool,
}

/// Compute every view for a snapshot at the given time.
///
/// Order is stable: balance, reservations summary, then one plate view per
/// known plate in lexicographic order.
pub fn compute_views(snapshot: &PortalSnapshot, now: NaiveDateTime) -> Vec<EntityView> {
    let mut views = Vec::with_capacity(2 + snapshot.known_license_plates.len());

    views.push(EntityView::Balance(BalanceView {
        minutes: snapshot.balance.balance,
        remaining_upgrades: snapshot.balance.remaining_upgrades,
        remaining_downgrades: snapshot.balance.remaining_downgrades,
    }));

    let mut active_plates = Vec::new();
    let mut future_plates = Vec::new();
    for (plate, reservation) in &snapshot.active_reservations {
        if reservation_is_current(reservation, now) {
            active_plates.push(plate.clone());
        } else {
            future_plates.push(plate.clone());
        }
    }
    active_plates.sort();
    future_plates.sort();
    views.push(EntityView::Reservations(ReservationsSummary {
        total: active_plates.len() + future_plates.len(),
        active_plates,
        future_plates,
    }));

    let mut plates: Vec<&String> = snapshot.known_license_plates.keys().collect();
    plates.sort();
    for plate in plates {
        views.push(EntityView::Plate(PlatePresence {
            plate: plate.clone(),
            name: snapshot.plate_name(plate).map(String::from),
            present: snapshot.plate_present(plate, now),
        }));
    }

    views
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActiveReservation, Balance, VENDOR_TIMESTAMP_FORMAT};
    use pretty_assertions::assert_eq;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, VENDOR_TIMESTAMP_FORMAT).unwrap()
    }

    fn snapshot_with_reservations() -> PortalSnapshot {
        let mut snapshot = PortalSnapshot {
            balance: Balance {
                balance: Some(380.0),
                remaining_upgrades: Some(2),
                remaining_downgrades: Some(0),
            },
            unit_price: Some(0.1),
            ..Default::default()
        };
        snapshot.active_reservations.insert(
            "AB-123-C".to_string(),
            ActiveReservation {
                reservation_id: Some(10),
                valid_from: Some("2024-05-01T11:00:00".to_string()),
                valid_until: Some("2024-05-01T13:00:00".to_string()),
                license_plate: "AB-123-C".to_string(),
                units: Some(120),
                cost: Some(12.0),
            },
        );
        snapshot.active_reservations.insert(
            "XY-999-Z".to_string(),
            ActiveReservation {
                reservation_id: Some(11),
                valid_from: Some("2024-05-01T18:00:00".to_string()),
                valid_until: Some("2024-05-01T20:00:00".to_string()),
                license_plate: "XY-999-Z".to_string(),
                units: Some(120),
                cost: Some(12.0),
            },
        );
        snapshot
            .known_license_plates
            .insert("AB-123-C".to_string(), Some("Jan".to_string()));
        snapshot
            .known_license_plates
            .insert("XY-999-Z".to_string(), None);
        snapshot
    }

    #[test]
    fn summary_splits_active_and_future() {
        let snapshot = snapshot_with_reservations();
        let views = compute_views(&snapshot, ts("2024-05-01T12:00:00"));

        let summary = views
            .iter()
            .find_map(|v| match v {
                EntityView::Reservations(s) => Some(s),
                _ => None,
            })
            .unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.active_plates, vec!["AB-123-C".to_string()]);
        assert_eq!(summary.future_plates, vec!["XY-999-Z".to_string()]);
    }

    #[test]
    fn plate_views_carry_names_and_presence() {
        let snapshot = snapshot_with_reservations();
        let views = compute_views(&snapshot, ts("2024-05-01T12:00:00"));

        let plates: Vec<&PlatePresence> = views
            .iter()
            .filter_map(|v| match v {
                EntityView::Plate(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(plates.len(), 2);
        assert_eq!(plates[0].plate, "AB-123-C");
        assert_eq!(plates[0].name.as_deref(), Some("Jan"));
        assert!(plates[0].present);
        assert_eq!(plates[1].plate, "XY-999-Z");
        assert_eq!(plates[1].name, None);
        assert!(!plates[1].present);
    }

    #[test]
    fn unparseable_window_counts_as_future() {
        let mut snapshot = snapshot_with_reservations();
        snapshot.active_reservations.insert(
            "QQ-000-Q".to_string(),
            ActiveReservation {
                reservation_id: None,
                valid_from: None,
                valid_until: None,
                license_plate: "QQ-000-Q".to_string(),
                units: None,
                cost: None,
            },
        );
        let views = compute_views(&snapshot, ts("2024-05-01T12:00:00"));
        let summary = views
            .iter()
            .find_map(|v| match v {
                EntityView::Reservations(s) => Some(s),
                _ => None,
            })
            .unwrap();
        assert_eq!(summary.total, 3);
        assert!(summary.future_plates.contains(&"QQ-000-Q".to_string()));
    }

    #[test]
    fn views_are_deterministic() {
        let snapshot = snapshot_with_reservations();
        let now = ts("2024-05-01T12:00:00");
        assert_eq!(compute_views(&snapshot, now), compute_views(&snapshot, now));
    }
}
