//! Status export: one CSV row per element.
//!
//! ```text
//! elementid,name,definition,mapped_manually,materialized,ready
//! 1.00,Soil,combination,true,true,true
//! 31.00,"Oak, white",subset,false,false,true
//! ```

use std::io::Write;

use crate::proximity::Proximity;
use crate::store::RasterStore;
use crate::{Engine, Result};

/// Write the status of every element, in table order.
pub fn export_status_csv<S: RasterStore, P: Proximity>(
    engine: &Engine<S, P>,
    writer: &mut dyn Write,
) -> Result<()> {
    writeln!(writer, "elementid,name,definition,mapped_manually,materialized,ready")?;
    for element in engine.tables().elements() {
        writeln!(
            writer,
            "{},{},{},{},{},{}",
            csv_field(element.id.as_str()),
            csv_field(&element.name),
            element.definition,
            element.mapped_manually,
            engine.is_materialized(&element.id),
            engine.is_ready(&element.id),
        )?;
    }
    Ok(())
}

/// Quote a field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
