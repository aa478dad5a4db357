//! Reserve and end commands

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use dvs_client::DvsPortal;
use dvs_core::VENDOR_TIMESTAMP_FORMAT;

use crate::commands::render_snapshot;
use crate::output::OutputContext;

/// Create a reservation for a plate; permit defaults come from a fresh
/// snapshot, and the state is re-rendered afterwards.
pub async fn reserve(
    portal: &DvsPortal,
    plate: &str,
    name: Option<&str>,
    from: Option<&str>,
    until: Option<&str>,
    ctx: &OutputContext,
) -> Result<()> {
    // Populate permit defaults before acting
    portal.update().await?;

    let from = from.map(parse_timestamp).transpose()?;
    let until = until.map(parse_timestamp).transpose()?;

    portal
        .create_reservation(plate, name, None, None, from, until)
        .await?;
    ctx.success(&format!("Reservation created for {}", plate));

    let snapshot = portal.update().await?;
    render_snapshot(&snapshot, ctx);
    Ok(())
}

/// End a reservation, addressed by reservation id or by plate.
pub async fn end(portal: &DvsPortal, reservation: &str, ctx: &OutputContext) -> Result<()> {
    let snapshot = portal.update().await?;

    let id = match reservation.parse::<i64>() {
        Ok(id) => id,
        Err(_) => snapshot
            .active_reservations
            .get(reservation)
            .and_then(|r| r.reservation_id)
            .with_context(|| format!("No active reservation for plate {}", reservation))?,
    };

    portal.end_reservation(id, None, None).await?;
    ctx.success(&format!("Reservation {} ended", id));

    let snapshot = portal.update().await?;
    render_snapshot(&snapshot, ctx);
    Ok(())
}

fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, VENDOR_TIMESTAMP_FORMAT)
        .with_context(|| format!("Invalid timestamp {:?}, expected YYYY-MM-DDTHH:MM:SS", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vendor_format_only() {
        assert!(parse_timestamp("2024-05-01T12:00:00").is_ok());
        assert!(parse_timestamp("2024-05-01 12:00").is_err());
    }
}
