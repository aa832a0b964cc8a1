//! CSV export of screening results.

use std::path::Path;

use super::{ScreenError, ScreeningResult};

/// Write one row per result: symbol, display name, price, volume, the
/// matched condition names (semicolon-joined), and the timestamp.
pub fn export_csv(results: &[ScreeningResult], path: &Path) -> Result<(), ScreenError> {
    let mut writer =
        csv::Writer::from_path(path).map_err(|e| ScreenError::Export(e.to_string()))?;

    writer
        .write_record([
            "symbol",
            "display_name",
            "current_price",
            "current_volume",
            "matched_conditions",
            "timestamp",
        ])
        .map_err(|e| ScreenError::Export(e.to_string()))?;

    for result in results {
        writer
            .write_record([
                result.symbol.as_str(),
                result.display_name.as_str(),
                &result.current_price.to_string(),
                &result.current_volume.to_string(),
                &result.matched_names().join(";"),
                &result.timestamp.to_string(),
            ])
            .map_err(|e| ScreenError::Export(e.to_string()))?;
    }

    writer
        .flush()
        .map_err(|e| ScreenError::Export(e.to_string()))?;
    Ok(())
}
