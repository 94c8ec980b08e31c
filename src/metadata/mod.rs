pub mod anomalies;
pub mod exif;
pub mod tags;
