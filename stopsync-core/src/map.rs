//! Crowd-sourced map elements and the cached map snapshot.
//!
//! The structures mirror the Overpass API JSON output so a response body can
//! be cached verbatim and read back without translation.

use chrono::{DateTime, Utc};

/// Attribute bag of a map element.
///
/// Only the tags relevant to bus stops are retained; anything else in the
/// upstream payload is discarded on decode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ElementTags {
    /// `bench`
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub bench: Option<String>,
    /// `bin`
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub bin: Option<String>,
    /// `bus`
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub bus: Option<String>,
    /// `check_date:shelter`
    #[cfg_attr(
        feature = "serde",
        serde(rename = "check_date:shelter", skip_serializing_if = "Option::is_none")
    )]
    pub check_date_shelter: Option<String>,
    /// `departures_board`
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub departures_board: Option<String>,
    /// `highway`
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub highway: Option<String>,
    /// `lit`
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub lit: Option<String>,
    /// `name`; compared against stop display values.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
    /// `operator`
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub operator: Option<String>,
    /// `public_transport`
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub public_transport: Option<String>,
    /// `shelter`
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub shelter: Option<String>,
    /// `tactile_paving`
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub tactile_paving: Option<String>,
    /// `wheelchair`
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub wheelchair: Option<String>,
}

/// A single geo-tagged map feature.
///
/// Coordinates are WGS84 degrees. Ways carry no coordinates in the Overpass
/// `out;` mode and decode with `0.0` for both.
///
/// # Examples
/// ```
/// use stopsync_core::MapElement;
///
/// let element = MapElement::node(7, 54.31, 13.09).with_name("Markt");
/// assert_eq!(element.name(), "Markt");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapElement {
    /// Element kind (`node`, `way`, `relation`).
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: String,
    /// Upstream identifier, unique per kind.
    pub id: u64,
    /// Latitude in degrees.
    #[cfg_attr(feature = "serde", serde(default))]
    pub lat: f64,
    /// Longitude in degrees.
    #[cfg_attr(feature = "serde", serde(default))]
    pub lon: f64,
    /// Known attributes.
    #[cfg_attr(feature = "serde", serde(default))]
    pub tags: ElementTags,
}

impl MapElement {
    /// Construct a node element without tags.
    #[must_use]
    pub fn node(id: u64, lat: f64, lon: f64) -> Self {
        Self {
            kind: "node".to_owned(),
            id,
            lat,
            lon,
            tags: ElementTags::default(),
        }
    }

    /// Set the `name` attribute.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.tags.name = Some(name.into());
        self
    }

    /// The `name` attribute, or the empty string when absent.
    #[must_use]
    pub fn name(&self) -> &str {
        self.tags.name.as_deref().unwrap_or_default()
    }
}

/// Freshness metadata reported by the map database.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MapProvenance {
    /// Last update applied to the base map data.
    pub timestamp_osm_base: Option<DateTime<Utc>>,
    /// Last rebuild of the area index used by area queries.
    pub timestamp_areas_base: Option<DateTime<Utc>>,
    /// Licence notice attached to the data.
    pub copyright: String,
}

/// The cached collection of map elements.
///
/// There is one snapshot per process, shared by every locality.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MapSnapshot {
    /// Output format version reported by the service.
    pub version: f64,
    /// Identifier of the generating service.
    pub generator: String,
    /// Database freshness metadata.
    pub osm3s: MapProvenance,
    /// Elements in service order.
    pub elements: Vec<MapElement>,
}

impl MapSnapshot {
    /// Construct a snapshot from elements with empty provenance.
    #[must_use]
    pub fn from_elements<I>(elements: I) -> Self
    where
        I: IntoIterator<Item = MapElement>,
    {
        Self {
            elements: elements.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Freshness metadata for the snapshot.
    #[must_use]
    pub const fn provenance(&self) -> &MapProvenance {
        &self.osm3s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn missing_name_reads_as_empty() {
        let element = MapElement::node(1, 0.0, 0.0);
        assert_eq!(element.name(), "");
    }

    #[cfg(feature = "serde")]
    #[rstest]
    fn decodes_overpass_payload() {
        let payload = r#"{
            "version": 0.6,
            "generator": "Overpass API 0.7.61",
            "osm3s": {
                "timestamp_osm_base": "2024-05-01T11:59:02Z",
                "timestamp_areas_base": "2024-05-01T10:00:00Z",
                "copyright": "The data included in this document is from www.openstreetmap.org."
            },
            "elements": [
                {
                    "type": "node",
                    "id": 253781230,
                    "lat": 54.3095,
                    "lon": 13.0890,
                    "tags": {
                        "bus": "yes",
                        "check_date:shelter": "2023-06-01",
                        "highway": "bus_stop",
                        "name": "Markt",
                        "network": "VVR"
                    }
                },
                {
                    "type": "way",
                    "id": 99,
                    "nodes": [1, 2, 3],
                    "tags": { "highway": "bus_stop" }
                }
            ]
        }"#;
        let snapshot: MapSnapshot = serde_json::from_str(payload).expect("decode snapshot");

        assert_eq!(snapshot.generator, "Overpass API 0.7.61");
        assert!(snapshot.provenance().timestamp_osm_base.is_some());
        assert_eq!(snapshot.elements.len(), 2);

        let node = &snapshot.elements[0];
        assert_eq!(node.kind, "node");
        assert_eq!(node.name(), "Markt");
        assert_eq!(node.tags.check_date_shelter.as_deref(), Some("2023-06-01"));

        let way = &snapshot.elements[1];
        assert_eq!(way.kind, "way");
        assert_eq!(way.name(), "");
        assert_eq!(way.tags.highway.as_deref(), Some("bus_stop"));
    }
}
