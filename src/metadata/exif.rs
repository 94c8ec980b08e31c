use std::{fs::File, io::BufReader, path::Path};

use image::{ImageFormat, ImageReader};
use log::debug;
use serde_json::{Map, Value};

use crate::{
    MetadataRecord,
    error::{ForensicsError, Result},
    metadata::tags::tag_name,
};

pub struct MetadataInspector;

impl MetadataInspector {
    /// Capture metadata of the image at `path`. An image without EXIF yields an
    /// empty record; only unreadable or corrupt files produce an error record.
    pub fn inspect<P: AsRef<Path>>(path: P) -> MetadataRecord {
        match Self::extract(&path) {
            Ok(tags) => MetadataRecord::Tags(tags),
            Err(err) => {
                debug!("metadata unavailable for {}: {}", path.as_ref().display(), err);
                MetadataRecord::failed(err.to_string())
            }
        }
    }

    pub fn extract<P: AsRef<Path>>(path: P) -> Result<Map<String, Value>> {
        let path = path.as_ref();
        let reader = ImageReader::open(path)?.with_guessed_format()?;
        let format = reader.format().ok_or_else(|| {
            ForensicsError::MetadataReadFailure(format!(
                "cannot identify image file {}",
                path.display()
            ))
        })?;
        reader.into_dimensions()?;

        if !Self::carries_exif(format) {
            return Ok(Map::new());
        }

        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        match exif::Reader::new().read_from_container(&mut reader) {
            Ok(exif_data) => Ok(Self::collect_tags(&exif_data)),
            Err(exif::Error::NotFound(_)) => Ok(Map::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn carries_exif(format: ImageFormat) -> bool {
        matches!(
            format,
            ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Tiff | ImageFormat::WebP | ImageFormat::Avif
        )
    }

    /// Primary-image TIFF and EXIF tags in file order, named through the tag
    /// dictionary. Thumbnail, GPS, and interoperability fields are left out.
    fn collect_tags(exif_data: &exif::Exif) -> Map<String, Value> {
        let mut tags = Map::new();

        for field in exif_data.fields() {
            if field.ifd_num != exif::In::PRIMARY {
                continue;
            }
            if !matches!(field.tag.context(), exif::Context::Tiff | exif::Context::Exif) {
                continue;
            }
            let Some(name) = tag_name(field.tag.number()) else {
                continue;
            };
            tags.insert(name.to_string(), Self::field_value(field));
        }

        tags
    }

    fn field_value(field: &exif::Field) -> Value {
        use exif::Value as Raw;

        match &field.value {
            Raw::Ascii(parts) => collapse(
                parts
                    .iter()
                    .map(|bytes| Value::String(ascii_text(bytes)))
                    .collect(),
            ),
            Raw::Byte(values) => collapse(values.iter().map(|&v| Value::from(v)).collect()),
            Raw::Short(values) => collapse(values.iter().map(|&v| Value::from(v)).collect()),
            Raw::Long(values) => collapse(values.iter().map(|&v| Value::from(v)).collect()),
            Raw::SByte(values) => collapse(values.iter().map(|&v| Value::from(v)).collect()),
            Raw::SShort(values) => collapse(values.iter().map(|&v| Value::from(v)).collect()),
            Raw::SLong(values) => collapse(values.iter().map(|&v| Value::from(v)).collect()),
            Raw::Float(values) => collapse(values.iter().map(|&v| Value::from(v)).collect()),
            Raw::Double(values) => collapse(values.iter().map(|&v| Value::from(v)).collect()),
            Raw::Rational(values) => {
                collapse(values.iter().map(|r| Value::from(r.to_f64())).collect())
            }
            Raw::SRational(values) => {
                collapse(values.iter().map(|r| Value::from(r.to_f64())).collect())
            }
            _ => Value::String(field.display_value().to_string()),
        }
    }
}

fn ascii_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

/// Single-component values are stored as scalars, others as arrays.
fn collapse(mut values: Vec<Value>) -> Value {
    if values.len() == 1 {
        values.pop().unwrap_or(Value::Null)
    } else {
        Value::Array(values)
    }
}
