//! FILENAME: report-engine/src/derived.rs
//! PURPOSE: Per-row fuel-economy metrics over a series of fill-ups.
//! CONTEXT: Each row is compared with the reading before it, so rows are put
//! in date order first. Readings are stored in km and quantities in litres;
//! the unit converter decides what the report shows.

use report_core::{round_to, Row, UnitConverter, Value};
use report_template::DataSourceConfig;

use crate::repository::EntityKind;

pub const DATE_FIELD: &str = "date";
/// Odometer reading. Input in km, rewritten to the display unit.
pub const READING_FIELD: &str = "mileage";
pub const QUANTITY_FIELD: &str = "litres";
pub const DISTANCE_FIELD: &str = "miles";
pub const ECONOMY_FIELD: &str = "mpg";
pub const CUMULATIVE_QUANTITY_FIELD: &str = "cumulativeLitres";
pub const CUMULATIVE_DISTANCE_FIELD: &str = "cumulativeMiles";

/// True when a source is a fill-up series: it opts in explicitly, or it reads
/// fuel records directly.
pub fn wants_fuel_economy(name: &str, config: &DataSourceConfig) -> bool {
    if config.derived.is_some() {
        return true;
    }
    if config.merge.is_some() {
        return false;
    }
    let entity = config.entity.as_deref().unwrap_or(name);
    EntityKind::from_name(entity) == Some(EntityKind::FuelRecord)
}

/// Rewrites `rows` in date order with distance, economy and running totals.
///
/// The first row has no previous reading, so its distance and economy are
/// null. A reading that does not advance gets distance 0 and a null economy,
/// but its quantity still counts toward the running total.
pub fn apply_fuel_economy(rows: &mut [Row], units: &dyn UnitConverter) {
    rows.sort_by(|a, b| {
        a.value(DATE_FIELD)
            .display_string()
            .cmp(&b.value(DATE_FIELD).display_string())
    });

    let mut previous: Option<f64> = None;
    let mut cumulative_quantity = 0.0;
    let mut cumulative_distance = 0.0;

    for row in rows.iter_mut() {
        let reading = row.value(READING_FIELD).as_number();
        let quantity = row.value(QUANTITY_FIELD).as_number();

        if let Some(km) = reading {
            row.insert(READING_FIELD, units.to_display_distance(km));
        }

        let mut distance = Value::Null;
        let mut economy = Value::Null;
        if let (Some(prev), Some(km), Some(litres)) = (previous, reading, quantity) {
            if litres > 0.0 {
                let delta = km - prev;
                if delta > 0.0 {
                    distance = Value::Number(units.to_display_distance(delta));
                    economy = Value::Number(units.economy(delta, litres));
                } else {
                    distance = Value::Number(0.0);
                }
            }
        }

        cumulative_quantity = round_to(cumulative_quantity + quantity.unwrap_or(0.0), 2);
        cumulative_distance = round_to(cumulative_distance + distance.to_number_lossy(), 0);

        row.insert(DISTANCE_FIELD, distance);
        row.insert(ECONOMY_FIELD, economy);
        row.insert(CUMULATIVE_QUANTITY_FIELD, cumulative_quantity);
        row.insert(CUMULATIVE_DISTANCE_FIELD, cumulative_distance);

        previous = reading;
    }
}
