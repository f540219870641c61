//! Field metadata carried alongside every data array.

use serde::{Deserialize, Serialize};

/// Physical unit of a precipitation field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    /// Radar reflectivity factor.
    #[serde(rename = "dBZ")]
    Dbz,
    /// Rain rate.
    #[serde(rename = "mm/h")]
    MmPerHour,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dbz => "dBZ",
            Self::MmPerHour => "mm/h",
        }
    }

    /// Parse a unit attribute (case-insensitive, accepts a few spellings).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "dbz" => Some(Self::Dbz),
            "mm/h" | "mm h-1" | "mm/hr" | "rrate" => Some(Self::MmPerHour),
            _ => None,
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Value transform currently applied on top of the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Transform {
    /// Linear values in the declared unit.
    #[default]
    None,
    /// `10 * log10` of the linear values.
    #[serde(rename = "dB")]
    Decibel,
}

impl Transform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Decibel => "dB",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "" | "None" | "none" | "null" => Some(Self::None),
            "dB" | "db" | "DB" => Some(Self::Decibel),
            _ => None,
        }
    }
}

impl std::fmt::Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Spatial reference of a radar composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// PROJ.4 definition string.
    pub projstr: String,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub xpixelsize: f64,
    pub ypixelsize: f64,
    /// Either "upper" or "lower".
    pub yorigin: String,
}

impl Projection {
    /// Attribute map as stored in archive files.
    pub fn to_attributes(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }

    /// Read projection attributes; `None` if `projstr` is absent.
    pub fn from_attributes(attrs: &serde_json::Map<String, serde_json::Value>) -> Option<Self> {
        let num = |key: &str| attrs.get(key).and_then(|v| v.as_f64()).unwrap_or(0.0);
        let projstr = attrs.get("projstr")?.as_str()?.to_string();
        Some(Self {
            projstr,
            x1: num("x1"),
            y1: num("y1"),
            x2: num("x2"),
            y2: num("y2"),
            xpixelsize: num("xpixelsize"),
            ypixelsize: num("ypixelsize"),
            yorigin: attrs
                .get("yorigin")
                .and_then(|v| v.as_str())
                .unwrap_or("upper")
                .to_string(),
        })
    }
}

/// Grid dimensions of a single 2-D field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    pub height: usize,
    pub width: usize,
}

impl GridShape {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    /// Number of grid points in one field.
    pub fn len(&self) -> usize {
        self.height * self.width
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_tuple(&self) -> (usize, usize) {
        (self.height, self.width)
    }
}

/// Metadata describing how the values of a field array are expressed.
///
/// `zerovalue` and `threshold` are always in the *current* unit and
/// transform: converting a field rewrites them together with the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub unit: Unit,
    pub transform: Transform,
    /// Value used for "no precipitation".
    pub zerovalue: f64,
    /// Smallest value considered precipitation.
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection: Option<Projection>,
}

impl FieldMetadata {
    pub fn new(unit: Unit, zerovalue: f64, threshold: f64) -> Self {
        Self {
            unit,
            transform: Transform::None,
            zerovalue,
            threshold,
            projection: None,
        }
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn is_decibel(&self) -> bool {
        self.transform == Transform::Decibel
    }

    /// Flat attribute map (`unit`, `transform`, `zerovalue`, `threshold`
    /// plus projection keys).
    pub fn to_attributes(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut attrs = serde_json::Map::new();
        attrs.insert("unit".to_string(), serde_json::json!(self.unit.as_str()));
        attrs.insert(
            "transform".to_string(),
            serde_json::json!(self.transform.as_str()),
        );
        attrs.insert("zerovalue".to_string(), serde_json::json!(self.zerovalue));
        attrs.insert("threshold".to_string(), serde_json::json!(self.threshold));
        if let Some(projection) = &self.projection {
            attrs.extend(projection.to_attributes());
        }
        attrs
    }

    /// Parse the attribute map written by [`FieldMetadata::to_attributes`].
    ///
    /// Returns `None` when `unit`, `zerovalue` or `threshold` is missing or
    /// unrecognized. A missing `transform` means linear values.
    pub fn from_attributes(attrs: &serde_json::Map<String, serde_json::Value>) -> Option<Self> {
        let unit = Unit::parse(attrs.get("unit")?.as_str()?)?;
        let transform = match attrs.get("transform") {
            None | Some(serde_json::Value::Null) => Transform::None,
            Some(value) => Transform::parse(value.as_str()?)?,
        };
        Some(Self {
            unit,
            transform,
            zerovalue: attrs.get("zerovalue")?.as_f64()?,
            threshold: attrs.get("threshold")?.as_f64()?,
            projection: Projection::from_attributes(attrs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmi_projection() -> Projection {
        Projection {
            projstr: "+proj=stere +lon_0=25E +lat_0=90N +lat_ts=60 +a=6371288".to_string(),
            x1: 0.0,
            y1: 0.0,
            x2: 760.0,
            y2: 1226.0,
            xpixelsize: 1000.0,
            ypixelsize: 1000.0,
            yorigin: "upper".to_string(),
        }
    }

    #[test]
    fn test_unit_parse() {
        assert_eq!(Unit::parse("dBZ"), Some(Unit::Dbz));
        assert_eq!(Unit::parse("DBZ"), Some(Unit::Dbz));
        assert_eq!(Unit::parse("mm/h"), Some(Unit::MmPerHour));
        assert_eq!(Unit::parse("kelvin"), None);
    }

    #[test]
    fn test_transform_serde_names() {
        assert_eq!(
            serde_json::to_string(&Transform::Decibel).unwrap(),
            "\"dB\""
        );
        assert_eq!(Transform::parse("None"), Some(Transform::None));
        assert_eq!(Transform::parse("dB"), Some(Transform::Decibel));
    }

    #[test]
    fn test_metadata_attribute_roundtrip() {
        let mut meta = FieldMetadata::new(Unit::MmPerHour, 0.0, 0.1).with_projection(fmi_projection());
        meta.transform = Transform::Decibel;

        let attrs = meta.to_attributes();
        assert_eq!(attrs["unit"], "mm/h");
        assert_eq!(attrs["transform"], "dB");
        assert_eq!(attrs["xpixelsize"], 1000.0);

        let parsed = FieldMetadata::from_attributes(&attrs).unwrap();
        assert_eq!(parsed, meta);
    }

    #[test]
    fn test_metadata_missing_unit() {
        let mut attrs = FieldMetadata::new(Unit::Dbz, -10.0, -10.0).to_attributes();
        attrs.remove("unit");
        assert!(FieldMetadata::from_attributes(&attrs).is_none());
    }

    #[test]
    fn test_grid_shape() {
        let shape = GridShape::new(3, 4);
        assert_eq!(shape.len(), 12);
        assert!(!shape.is_empty());
        assert_eq!(shape.as_tuple(), (3, 4));
    }
}
