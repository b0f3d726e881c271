//! Intersects the carpark registry with a live availability snapshot.

use std::collections::BTreeMap;

use spot_on_carpark_models::{
    AvailabilitySnapshot, CandidateCarpark, CarparkRecord, LotAvailability, VehicleType,
};

/// Returns the registry carparks that currently have open lots for
/// `vehicle`, in registry order.
///
/// Only the snapshot entry whose lot type matches `vehicle` is consulted.
/// If a carpark lists the same lot type more than once, the last entry
/// wins. Carparks missing from the snapshot, with zero open lots, or with
/// an unparseable lot count are excluded.
#[must_use]
pub fn filter_available(
    registry: &[CarparkRecord],
    snapshot: &AvailabilitySnapshot,
    vehicle: VehicleType,
) -> Vec<CandidateCarpark> {
    let lookup = lots_by_carpark(snapshot, vehicle.lot_type());

    registry
        .iter()
        .filter_map(|record| {
            let lot = lookup.get(record.carpark_id.as_str())?;
            let Some(available) = lot.available() else {
                log::warn!(
                    "Carpark {}: unparseable lots_available '{}'",
                    record.carpark_id,
                    lot.lots_available
                );
                return None;
            };
            if available <= 0 {
                return None;
            }
            let available = u32::try_from(available).unwrap_or(u32::MAX);
            Some(CandidateCarpark::new(record.clone(), available))
        })
        .collect()
}

/// Builds carpark id -> lot entry for a single lot type.
fn lots_by_carpark<'a>(
    snapshot: &'a AvailabilitySnapshot,
    lot_type: &str,
) -> BTreeMap<&'a str, &'a LotAvailability> {
    let mut lookup = BTreeMap::new();
    for carpark in &snapshot.carparks {
        for lot in carpark.lots.iter().filter(|l| l.lot_type == lot_type) {
            lookup.insert(carpark.carpark_number.as_str(), lot);
        }
    }
    lookup
}
