//! Normalization of the vendor base payload into a [`PortalSnapshot`]
//!
//! Everything here is pure: the caller fetches `login/getbase`, hands the
//! parsed payload in, and commits the returned snapshot in one assignment.
//! Any error leaves the previously cached snapshot untouched.

use std::collections::HashMap;

use dvs_core::{ActiveReservation, Balance, HistoricReservation, PortalSnapshot};

use crate::error::{PortalError, Result};
use crate::types::{BaseResponse, HistoryItem, Permit, PermitMedia};

/// The portal redacts forgotten plates to a run of asterisks. Redacted
/// entries carry no usable identity and are dropped from known plates and
/// history alike.
fn is_redacted(plate: &str) -> bool {
    !plate.is_empty() && plate.bytes().all(|b| b == b'*')
}

/// Select the single permit the account must hold.
fn single_permit(base: &BaseResponse) -> Result<&Permit> {
    match base.permits.as_slice() {
        [] => Err(PortalError::NoPermit),
        [permit] => Ok(permit),
        _ => Err(PortalError::MultiplePermits),
    }
}

/// Build a snapshot from the base payload.
///
/// The account must hold exactly one permit with at least one permit media;
/// the first media is the active one.
pub(crate) fn from_base(base: &BaseResponse) -> Result<PortalSnapshot> {
    let permit = single_permit(base)?;
    let media = permit
        .permit_medias
        .first()
        .ok_or(PortalError::NoPermitMedia)?;

    let balance = Balance {
        balance: media.balance,
        remaining_upgrades: media.remaining_upgrades,
        remaining_downgrades: media.remaining_downgrades,
    };

    Ok(PortalSnapshot {
        balance,
        unit_price: permit.unit_price,
        default_type_id: media.type_id,
        default_code: media.code.clone(),
        active_reservations: active_reservations(media, permit.unit_price),
        historic_reservations: historic_reservations(media),
        known_license_plates: known_license_plates(media),
    })
}

/// One entry per active-reservation item, keyed by plate value. Items
/// without a plate value cannot be keyed and are skipped.
fn active_reservations(
    media: &PermitMedia,
    unit_price: Option<f64>,
) -> HashMap<String, ActiveReservation> {
    let mut reservations = HashMap::new();
    for item in &media.active_reservations {
        let Some(plate) = item.license_plate.value.clone() else {
            continue;
        };
        reservations.insert(
            plate.clone(),
            ActiveReservation {
                reservation_id: item.reservation_id,
                valid_from: item.valid_from.clone(),
                valid_until: item.valid_until.clone(),
                license_plate: plate,
                units: item.units,
                cost: reservation_cost(unit_price, item.units),
            },
        );
    }
    reservations
}

/// Cost of a reservation. Known only when the unit count is present and the
/// permit has a usable (non-zero) unit price; a missing unit count must not
/// surface as a zero cost. Zero units with a known price is a real zero.
fn reservation_cost(unit_price: Option<f64>, units: Option<i64>) -> Option<f64> {
    match (unit_price, units) {
        (Some(price), Some(units)) if price != 0.0 => Some(units as f64 * price),
        _ => None,
    }
}

/// Most recent historic reservation per display plate. The vendor lists
/// history newest-first, so the first occurrence of a plate wins.
fn historic_reservations(media: &PermitMedia) -> HashMap<String, HistoricReservation> {
    let mut recent = HashMap::new();
    for item in history_items(media) {
        let Some(plate) = item.license_plate.display_value.as_deref() else {
            continue;
        };
        if is_redacted(plate) {
            continue;
        }
        recent
            .entry(plate.to_string())
            .or_insert_with(|| HistoricReservation {
                reservation_id: item.reservation_id,
                valid_from: item.valid_from.clone(),
                valid_until: item.valid_until.clone(),
                units: item.units,
            });
    }
    recent
}

/// Merge known plates from three sources in increasing precedence: history
/// items (unnamed), active reservations (unnamed), explicit plate records
/// (named). Later sources overwrite earlier ones for the same key.
fn known_license_plates(media: &PermitMedia) -> HashMap<String, Option<String>> {
    let mut plates = HashMap::new();

    for item in history_items(media) {
        if let Some(plate) = item.license_plate.display_value.as_deref() {
            if !is_redacted(plate) {
                plates.insert(plate.to_string(), None);
            }
        }
    }

    for item in &media.active_reservations {
        if let Some(plate) = item.license_plate.value.as_deref() {
            plates.insert(plate.to_string(), None);
        }
    }

    for record in &media.license_plates {
        if let Some(plate) = record.value.as_deref() {
            plates.insert(plate.to_string(), record.name.clone());
        }
    }

    plates
}

fn history_items(media: &PermitMedia) -> impl Iterator<Item = &HistoryItem> {
    media
        .history
        .iter()
        .filter_map(|h| h.reservations.as_ref())
        .flat_map(|page| page.items.iter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn base(value: serde_json::Value) -> BaseResponse {
        serde_json::from_value(value).unwrap()
    }

    fn full_payload() -> serde_json::Value {
        json!({
            "Permits": [{
                "UnitPrice": 0.1,
                "PermitMedias": [{
                    "TypeID": 1,
                    "Code": "ZC12",
                    "Balance": 380.0,
                    "RemainingUpgrades": 2,
                    "RemainingDowngrades": 0,
                    "ActiveReservations": [
                        {
                            "ReservationID": 10,
                            "ValidFrom": "2024-05-01T11:00:00",
                            "ValidUntil": "2024-05-01T13:00:00",
                            "Units": 120,
                            "LicensePlate": {"Value": "AB-123-C"}
                        },
                        {
                            "ReservationID": 11,
                            "ValidFrom": "2024-05-01T18:00:00",
                            "ValidUntil": "2024-05-01T20:00:00",
                            "LicensePlate": {"Value": "XY-999-Z"}
                        }
                    ],
                    "LicensePlates": [
                        {"Value": "AB-123-C", "Name": "Jan"}
                    ],
                    "History": {
                        "Reservations": {
                            "Items": [
                                {
                                    "ReservationID": 8,
                                    "ValidFrom": "2024-04-28T09:00:00",
                                    "ValidUntil": "2024-04-28T11:00:00",
                                    "Units": 120,
                                    "LicensePlate": {"DisplayValue": "XY-999-Z"}
                                },
                                {
                                    "ReservationID": 5,
                                    "ValidFrom": "2024-04-20T09:00:00",
                                    "ValidUntil": "2024-04-20T10:00:00",
                                    "Units": 60,
                                    "LicensePlate": {"DisplayValue": "XY-999-Z"}
                                },
                                {
                                    "ReservationID": 4,
                                    "ValidFrom": "2024-04-19T09:00:00",
                                    "ValidUntil": "2024-04-19T10:00:00",
                                    "Units": 60,
                                    "LicensePlate": {"DisplayValue": "********"}
                                }
                            ]
                        }
                    }
                }]
            }]
        })
    }

    #[test]
    fn populates_defaults_and_balance() {
        let snapshot = from_base(&base(full_payload())).unwrap();
        assert_eq!(snapshot.default_type_id, Some(1));
        assert_eq!(snapshot.default_code.as_deref(), Some("ZC12"));
        assert_eq!(snapshot.balance.balance, Some(380.0));
        assert_eq!(snapshot.balance.remaining_upgrades, Some(2));
        assert_eq!(snapshot.balance.remaining_downgrades, Some(0));
        assert_eq!(snapshot.unit_price, Some(0.1));
    }

    #[test]
    fn computes_cost_only_when_units_and_price_are_known() {
        let snapshot = from_base(&base(full_payload())).unwrap();
        let with_units = &snapshot.active_reservations["AB-123-C"];
        assert_eq!(with_units.cost, Some(12.0));
        let without_units = &snapshot.active_reservations["XY-999-Z"];
        assert_eq!(without_units.units, None);
        assert_eq!(without_units.cost, None);
    }

    #[test]
    fn zero_units_cost_zero_but_missing_price_costs_nothing() {
        assert_eq!(reservation_cost(Some(0.1), Some(0)), Some(0.0));
        assert_eq!(reservation_cost(None, Some(120)), None);
        assert_eq!(reservation_cost(Some(0.0), Some(120)), None);
    }

    #[test]
    fn named_plates_win_the_merge() {
        let snapshot = from_base(&base(full_payload())).unwrap();
        assert_eq!(
            snapshot.known_license_plates["AB-123-C"],
            Some("Jan".to_string())
        );
        assert_eq!(snapshot.known_license_plates["XY-999-Z"], None);
    }

    #[test]
    fn redacted_plates_are_dropped_everywhere() {
        let snapshot = from_base(&base(full_payload())).unwrap();
        assert!(!snapshot.known_license_plates.contains_key("********"));
        assert!(!snapshot.historic_reservations.contains_key("********"));
        assert!(is_redacted("********"));
        assert!(is_redacted("*********"));
        assert!(!is_redacted("AB-123-C"));
        assert!(!is_redacted(""));
    }

    #[test]
    fn history_keeps_most_recent_entry_per_plate() {
        let snapshot = from_base(&base(full_payload())).unwrap();
        let entry = &snapshot.historic_reservations["XY-999-Z"];
        assert_eq!(entry.reservation_id, Some(8));
        assert_eq!(entry.valid_until.as_deref(), Some("2024-04-28T11:00:00"));
    }

    #[test]
    fn rejects_zero_and_multiple_permits() {
        let none = base(json!({"Permits": []}));
        assert!(matches!(from_base(&none), Err(PortalError::NoPermit)));

        let two = base(json!({"Permits": [
            {"PermitMedias": [{"TypeID": 1}]},
            {"PermitMedias": [{"TypeID": 2}]}
        ]}));
        assert!(matches!(from_base(&two), Err(PortalError::MultiplePermits)));
    }

    #[test]
    fn rejects_permit_without_media() {
        let empty = base(json!({"Permits": [{"PermitMedias": []}]}));
        assert!(matches!(from_base(&empty), Err(PortalError::NoPermitMedia)));
    }

    #[test]
    fn normalization_is_idempotent() {
        let payload = base(full_payload());
        assert_eq!(from_base(&payload).unwrap(), from_base(&payload).unwrap());
    }
}
