//! Track formats the gateway is willing to hand to the converter
//!
//! Only names in this list ever reach the gpsbabel command line, so request
//! parameters cannot smuggle arbitrary options into the process arguments.

use std::fmt;
use std::str::FromStr;

/// Supported track formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackFormat {
    /// GPS Exchange Format
    Gpx,
    /// Garmin Training Center XML
    Tcx,
    /// Google Earth Keyhole Markup Language
    Kml,
    /// GeoJSON
    GeoJson,
}

/// Error returned when a format name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported format: {0}")]
pub struct UnknownFormat(pub String);

impl TrackFormat {
    pub const ALL: [TrackFormat; 4] = [
        TrackFormat::Gpx,
        TrackFormat::Tcx,
        TrackFormat::Kml,
        TrackFormat::GeoJson,
    ];

    /// Name gpsbabel expects after `-i` / `-o`
    pub fn tool_name(self) -> &'static str {
        match self {
            TrackFormat::Gpx => "gpx",
            TrackFormat::Tcx => "gtrnctr",
            TrackFormat::Kml => "kml",
            TrackFormat::GeoJson => "geojson",
        }
    }

    /// File extension without the leading dot
    pub fn extension(self) -> &'static str {
        match self {
            TrackFormat::Gpx => "gpx",
            TrackFormat::Tcx => "tcx",
            TrackFormat::Kml => "kml",
            TrackFormat::GeoJson => "geojson",
        }
    }

    /// Content-Type used when returning a converted file
    pub fn content_type(self) -> &'static str {
        match self {
            TrackFormat::Gpx => "application/gpx+xml",
            TrackFormat::Tcx => "application/vnd.garmin.tcx+xml",
            TrackFormat::Kml => "application/vnd.google-earth.kml+xml",
            TrackFormat::GeoJson => "application/geo+json",
        }
    }

    /// Whether files of this format are XML documents
    pub fn is_xml(self) -> bool {
        !matches!(self, TrackFormat::GeoJson)
    }
}

impl FromStr for TrackFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        TrackFormat::ALL
            .into_iter()
            .find(|f| f.tool_name() == needle || f.extension() == needle)
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}

impl fmt::Display for TrackFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_by_tool_name_and_extension() {
        assert_eq!("gtrnctr".parse::<TrackFormat>().unwrap(), TrackFormat::Tcx);
        assert_eq!("tcx".parse::<TrackFormat>().unwrap(), TrackFormat::Tcx);
        assert_eq!("GPX".parse::<TrackFormat>().unwrap(), TrackFormat::Gpx);
        assert_eq!(" kml ".parse::<TrackFormat>().unwrap(), TrackFormat::Kml);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "-x; rm".parse::<TrackFormat>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported format: -x; rm");
    }

    #[test]
    fn test_geojson_is_not_xml() {
        assert!(TrackFormat::Gpx.is_xml());
        assert!(TrackFormat::Tcx.is_xml());
        assert!(!TrackFormat::GeoJson.is_xml());
    }

    #[test]
    fn test_display_uses_tool_name() {
        assert_eq!(TrackFormat::Tcx.to_string(), "gtrnctr");
    }
}
