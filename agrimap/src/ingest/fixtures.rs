//! Shared KML test documents.

/// A single named field polygon with one hole.
pub const FIELD_KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Placemark>
      <name>Maize plot 4</name>
      <Polygon>
        <outerBoundaryIs>
          <LinearRing>
            <coordinates>
              36.8219,-1.2921,0 36.8319,-1.2921,0 36.8319,-1.2821,0 36.8219,-1.2821,0 36.8219,-1.2921,0
            </coordinates>
          </LinearRing>
        </outerBoundaryIs>
        <innerBoundaryIs>
          <LinearRing>
            <coordinates>36.825,-1.29 36.827,-1.29 36.827,-1.288 36.825,-1.29</coordinates>
          </LinearRing>
        </innerBoundaryIs>
      </Polygon>
    </Placemark>
  </Document>
</kml>"#;

/// Polygon coordinates of [`FIELD_KML`]'s outer ring, as GeoJSON.
pub fn field_boundary() -> serde_json::Value {
    serde_json::json!({
        "type": "Polygon",
        "coordinates": [[
            [36.8219, -1.2921], [36.8319, -1.2921], [36.8319, -1.2821],
            [36.8219, -1.2821], [36.8219, -1.2921]
        ]]
    })
}

/// A fallback boundary somewhere else entirely.
pub fn fallback_boundary() -> serde_json::Value {
    serde_json::json!({
        "coordinates": [[[30.0, 0.0], [30.1, 0.0], [30.1, 0.1], [30.0, 0.1], [30.0, 0.0]]]
    })
}
