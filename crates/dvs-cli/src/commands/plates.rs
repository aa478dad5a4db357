//! Plates commands - list and store known license plates

use anyhow::Result;
use chrono::Local;
use dvs_client::DvsPortal;

use crate::output::{OutputContext, PlateRow};

/// List every plate the account knows about
pub async fn plates(portal: &DvsPortal, ctx: &OutputContext) -> Result<()> {
    let snapshot = portal.update().await?;
    let now = Local::now().naive_local();

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
    ctx.print(&rows);
    Ok(())
}

/// Store or rename a plate on the permit medium
pub async fn store_plate(
    portal: &DvsPortal,
    plate: &str,
    name: &str,
    ctx: &OutputContext,
) -> Result<()> {
    // Permit code defaults come from the snapshot
    portal.update().await?;
    portal.store_license_plate(plate, name, None).await?;
    ctx.success(&format!("Stored {} as {:?}", plate, name));

    plates(portal, ctx).await
}
