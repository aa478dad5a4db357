//! Status command - refresh once and render the account state

use anyhow::Result;
use chrono::Local;
use dvs_client::DvsPortal;
use dvs_core::PortalSnapshot;

use crate::output::{opt, BalanceRow, OutputContext, PlateRow, ReservationRow};

/// Refresh the snapshot and render balance, reservations and known plates
pub async fn status(portal: &DvsPortal, ctx: &OutputContext) -> Result<()> {
    let snapshot = portal.update().await?;
    render_snapshot(&snapshot, ctx);
    Ok(())
}

pub fn render_snapshot(snapshot: &PortalSnapshot, ctx: &OutputContext) {
    let now = Local::now().naive_local();

    ctx.heading("Balance");
    ctx.print(&[BalanceRow {
        minutes: opt(&snapshot.balance.balance),
        remaining_upgrades: opt(&snapshot.balance.remaining_upgrades),
        remaining_downgrades: opt(&snapshot.balance.remaining_downgrades),
        unit_price: opt(&snapshot.unit_price),
    }]);

    let mut reservations: Vec<&dvs_core::ActiveReservation> =
        snapshot.active_reservations.values().collect();
    reservations.sort_by(|a, b| a.license_plate.cmp(&b.license_plate));
    let rows: Vec<ReservationRow> = reservations
        .into_iter()
        .map(|r| ReservationRow {
            plate: r.license_plate.clone(),
            valid_from: opt(&r.valid_from),
            valid_until: opt(&r.valid_until),
            units: opt(&r.units),
            cost: r.cost.map(|c| format!("{:.2}", c)).unwrap_or_default(),
            reservation_id: opt(&r.reservation_id),
        })
        .collect();
    ctx.heading("Active reservations");
    ctx.print(&rows);

    let mut plates: Vec<&String> = snapshot.known_license_plates.keys().collect();
    plates.sort();
    let rows: Vec<PlateRow> = plates
        .into_iter()
        .map(|plate| PlateRow {
            plate: plate.clone(),
            name: snapshot.plate_name(plate).unwrap_or_default().to_string(),
            present: if snapshot.plate_present(plate, now) {
                "yes".to_string()
            } else {
                "no".to_string()
            },
        })
        .collect();
    ctx.heading("Known plates");
    ctx.print(&rows);
}
