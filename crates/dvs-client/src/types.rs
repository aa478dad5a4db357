//! Request and response types for the DVSPortal API
//!
//! The vendor uses PascalCase response payloads and mixed-case request
//! bodies; every field is renamed explicitly rather than relying on a
//! container-level rename rule.

use serde::{Deserialize, Serialize};

// =============================================================================
// Login
// =============================================================================

/// Body of `POST login`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    #[serde(rename = "identifier")]
    pub identifier: String,
    /// Fixed vendor login method for password-based accounts
    #[serde(rename = "loginMethod")]
    pub login_method: &'static str,
    #[serde(rename = "password")]
    pub password: String,
    #[serde(rename = "permitMediaTypeID")]
    pub permit_media_type_id: i64,
}

impl LoginRequest {
    pub fn password_login(identifier: &str, password: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            login_method: "Pas",
            password: password.to_string(),
            permit_media_type_id: 1,
        }
    }
}

/// Response of `POST login`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "Token")]
    pub token: String,
}

// =============================================================================
// Base payload (`POST login/getbase`)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BaseResponse {
    #[serde(default, rename = "Permits")]
    pub permits: Vec<Permit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Permit {
    #[serde(default, rename = "PermitMedias")]
    pub permit_medias: Vec<PermitMedia>,
    #[serde(default, rename = "UnitPrice")]
    pub unit_price: Option<f64>,
}

/// The sub-account actually holding balance, reservations and plates
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermitMedia {
    #[serde(default, rename = "TypeID")]
    pub type_id: Option<i64>,
    #[serde(default, rename = "Code")]
    pub code: Option<String>,
    #[serde(default, rename = "Balance")]
    pub balance: Option<f64>,
    #[serde(default, rename = "RemainingUpgrades")]
    pub remaining_upgrades: Option<i64>,
    #[serde(default, rename = "RemainingDowngrades")]
    pub remaining_downgrades: Option<i64>,
    #[serde(default, rename = "ActiveReservations")]
    pub active_reservations: Vec<VendorReservation>,
    #[serde(default, rename = "LicensePlates")]
    pub license_plates: Vec<NamedPlate>,
    #[serde(default, rename = "History")]
    pub history: Option<History>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VendorReservation {
    #[serde(default, rename = "ReservationID")]
    pub reservation_id: Option<i64>,
    #[serde(default, rename = "ValidFrom")]
    pub valid_from: Option<String>,
    #[serde(default, rename = "ValidUntil")]
    pub valid_until: Option<String>,
    #[serde(default, rename = "Units")]
    pub units: Option<i64>,
    #[serde(default, rename = "LicensePlate")]
    pub license_plate: PlateRef,
}

/// Plate reference as embedded in reservations and history items
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlateRef {
    #[serde(default, rename = "Value")]
    pub value: Option<String>,
    #[serde(default, rename = "DisplayValue")]
    pub display_value: Option<String>,
    #[serde(default, rename = "Name")]
    pub name: Option<String>,
}

/// Explicitly stored plate record with a display name
#[derive(Debug, Clone, Deserialize)]
pub struct NamedPlate {
    #[serde(default, rename = "Value")]
    pub value: Option<String>,
    #[serde(default, rename = "Name")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct History {
    #[serde(default, rename = "Reservations")]
    pub reservations: Option<HistoryPage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryPage {
    #[serde(default, rename = "Items")]
    pub items: Vec<HistoryItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryItem {
    #[serde(default, rename = "ReservationID")]
    pub reservation_id: Option<i64>,
    #[serde(default, rename = "ValidFrom")]
    pub valid_from: Option<String>,
    #[serde(default, rename = "ValidUntil")]
    pub valid_until: Option<String>,
    #[serde(default, rename = "Units")]
    pub units: Option<i64>,
    #[serde(default, rename = "LicensePlate")]
    pub license_plate: PlateRef,
}

// =============================================================================
// Action bodies
// =============================================================================

/// Plate as sent in action bodies; `Name` is serialized even when null
#[derive(Debug, Clone, Serialize)]
pub struct PlateBody {
    #[serde(rename = "Value")]
    pub value: String,
    #[serde(rename = "Name")]
    pub name: Option<String>,
}

/// Body of `POST reservation/create`
#[derive(Debug, Clone, Serialize)]
pub struct CreateReservationRequest {
    #[serde(rename = "DateFrom")]
    pub date_from: String,
    #[serde(rename = "LicensePlate")]
    pub license_plate: PlateBody,
    #[serde(rename = "permitMediaTypeID")]
    pub permit_media_type_id: Option<i64>,
    #[serde(rename = "permitMediaCode")]
    pub permit_media_code: Option<String>,
    /// Only sent when an end time was supplied
    #[serde(rename = "DateUntil", skip_serializing_if = "Option::is_none")]
    pub date_until: Option<String>,
}

/// Body of `POST reservation/end`
#[derive(Debug, Clone, Serialize)]
pub struct EndReservationRequest {
    #[serde(rename = "ReservationID")]
    pub reservation_id: i64,
    #[serde(rename = "permitMediaTypeID")]
    pub permit_media_type_id: Option<i64>,
    #[serde(rename = "permitMediaCode")]
    pub permit_media_code: Option<String>,
}

/// Body of `POST permitmedialicenseplate/upsert`
#[derive(Debug, Clone, Serialize)]
pub struct StoreLicensePlateRequest {
    #[serde(rename = "permitMediaTypeID")]
    pub permit_media_type_id: i64,
    #[serde(rename = "permitMediaCode")]
    pub permit_media_code: Option<String>,
    #[serde(rename = "licensePlate")]
    pub license_plate: PlateBody,
    /// Always null; the portal distinguishes insert from update itself
    #[serde(rename = "updateLicensePlate")]
    pub update_license_plate: Option<serde_json::Value>,
}
