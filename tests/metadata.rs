mod common;

use common::{DATE_TIME, ExifEntry, MAKE, ORIENTATION, UNKNOWN_TAG, write_jpeg_with_exif};
use receipt_forensics::{
    ForensicsAnalyzer,
    metadata::{anomalies::derive_anomalies, exif::MetadataInspector},
};
use serde_json::json;

#[test]
fn exif_tags_are_named_in_file_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("receipt.jpg");
    write_jpeg_with_exif(
        &path,
        &[
            ExifEntry::Ascii(MAKE, "Canon"),
            ExifEntry::Short(ORIENTATION, 6),
            ExifEntry::Ascii(DATE_TIME, "2024:03:01 09:15:00"),
        ],
    );

    let tags = MetadataInspector::extract(&path).unwrap();
    let names = tags.keys().map(String::as_str).collect::<Vec<_>>();
    assert_eq!(names, vec!["Make", "Orientation", "DateTime"]);
    assert_eq!(tags["Make"], json!("Canon"));
    assert_eq!(tags["Orientation"], json!(6));
    assert_eq!(tags["DateTime"], json!("2024:03:01 09:15:00"));
}

#[test]
fn unnamed_tags_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("receipt.jpg");
    write_jpeg_with_exif(
        &path,
        &[ExifEntry::Ascii(MAKE, "Canon"), ExifEntry::Short(UNKNOWN_TAG, 7)],
    );

    let record = MetadataInspector::inspect(&path);
    assert!(record.error().is_none());
    assert_eq!(serde_json::to_value(&record).unwrap(), json!({"Make": "Canon"}));
}

#[test]
fn complete_capture_is_not_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("upright.jpg");
    write_jpeg_with_exif(
        &path,
        &[
            ExifEntry::Short(ORIENTATION, 1),
            ExifEntry::Ascii(DATE_TIME, "2024:03:01 09:15:00"),
        ],
    );

    let finding = ForensicsAnalyzer::new().build_finding(&path);
    assert!(!finding.anomalies.missing_datetime);
    assert!(!finding.anomalies.strange_orientation);
}

#[test]
fn upside_down_capture_is_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flipped.jpg");
    write_jpeg_with_exif(
        &path,
        &[
            ExifEntry::Short(ORIENTATION, 3),
            ExifEntry::Ascii(DATE_TIME, "2024:03:01 09:15:00"),
        ],
    );

    let flags = derive_anomalies(&MetadataInspector::inspect(&path));
    assert!(!flags.missing_datetime);
    assert!(flags.strange_orientation);
}

#[test]
fn missing_datetime_is_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("undated.jpg");
    write_jpeg_with_exif(&path, &[ExifEntry::Short(ORIENTATION, 8)]);

    let flags = derive_anomalies(&MetadataInspector::inspect(&path));
    assert!(flags.missing_datetime);
    assert!(!flags.strange_orientation);
}
