use crate::{AnomalyFlags, MetadataRecord};

/// Orientation codes accepted for document captures: upright and the two
/// 90-degree rotations.
pub const EXPECTED_ORIENTATIONS: [u64; 3] = [1, 6, 8];

const DEFAULT_ORIENTATION: u64 = 1;

/// Anomaly flags for a metadata record. A failed extraction is treated like a
/// record with no tags.
pub fn derive_anomalies(record: &MetadataRecord) -> AnomalyFlags {
    let missing_datetime = record.get("DateTime").is_none();

    let strange_orientation = match record.get("Orientation") {
        None => !EXPECTED_ORIENTATIONS.contains(&DEFAULT_ORIENTATION),
        Some(value) => value
            .as_u64()
            .is_none_or(|code| !EXPECTED_ORIENTATIONS.contains(&code)),
    };

    AnomalyFlags {
        missing_datetime,
        strange_orientation,
    }
}
