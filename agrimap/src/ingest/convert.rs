//! KML to canonical geometry conversion.
//!
//! Conversion is attempted in two tiers:
//!
//! 1. the conversion library resolved by [`resolve_capability`](super::resolve_capability),
//!    wrapped as a [`KmlConverter`];
//! 2. [`ManualExtractor`], which reads raw `<coordinates>` text from
//!    `<Polygon>` elements and builds the polygon collection directly.
//!
//! Only when both fail does the pipeline report a conversion failure.

use std::sync::Arc;

use ::kml::types::Geometry as KmlGeometry;
use ::kml::Kml;
use geo::{LineString, Polygon};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{trace, warn};

use super::document::KmlDocument;
use super::error::KmlError;
use crate::geometry::{ring_from_positions, Geometry, NamedPolygon};

/// The narrow conversion interface the pipeline depends on.
pub trait KmlConverter: Send + Sync {
    fn convert(&self, doc: &KmlDocument) -> Result<Geometry, KmlError>;
}

/// A conversion function as exported by a conversion library.
pub type ConvertFn = Arc<dyn Fn(&KmlDocument) -> Result<Geometry, KmlError> + Send + Sync>;

/// Adapts an exported [`ConvertFn`] to [`KmlConverter`].
#[derive(Clone)]
pub struct FnConverter {
    export: String,
    convert: ConvertFn,
}

impl FnConverter {
    pub fn new(export: impl Into<String>, convert: ConvertFn) -> Self {
        Self {
            export: export.into(),
            convert,
        }
    }

    /// Name of the export this converter was resolved from.
    pub fn export(&self) -> &str {
        &self.export
    }
}

impl std::fmt::Debug for FnConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnConverter")
            .field("export", &self.export)
            .finish_non_exhaustive()
    }
}

impl KmlConverter for FnConverter {
    fn convert(&self, doc: &KmlDocument) -> Result<Geometry, KmlError> {
        (self.convert)(doc)
    }
}

/// Converts with the `kml` crate.
///
/// A document that converts without error but holds no polygon is treated
/// as a conversion failure so that manual extraction still gets a chance.
pub fn convert_with_kml_crate(doc: &KmlDocument) -> Result<Geometry, KmlError> {
    let kml = doc
        .text()
        .parse::<Kml<f64>>()
        .map_err(|e| KmlError::Conversion(e.to_string()))?;

    let mut polygons = Vec::new();
    collect_kml(kml, &mut polygons);

    let geometry = Geometry::from_polygons(polygons)
        .ok_or_else(|| KmlError::Conversion("document contains no polygon".to_string()))?;
    geometry
        .check()
        .map_err(|e| KmlError::Conversion(format!("library produced invalid geometry: {}", e)))?;

    Ok(geometry)
}

/// Walks the element tree, naming polygons after their enclosing placemark.
fn collect_kml(kml: Kml<f64>, out: &mut Vec<NamedPolygon>) {
    match kml {
        Kml::KmlDocument(doc) => doc.elements.into_iter().for_each(|e| collect_kml(e, out)),
        Kml::Document { elements, .. } | Kml::Folder { elements, .. } => {
            elements.into_iter().for_each(|e| collect_kml(e, out))
        }
        Kml::Placemark(placemark) => {
            if let Some(geometry) = placemark.geometry {
                let name = placemark.name.map(|n| n.trim().to_string());
                collect_geometry(geometry, name.as_deref(), out);
            }
        }
        Kml::Polygon(polygon) => collect_geometry(KmlGeometry::Polygon(polygon), None, out),
        Kml::MultiGeometry(multi) => {
            collect_geometry(KmlGeometry::MultiGeometry(multi), None, out)
        }
        _ => {}
    }
}

fn collect_geometry(
    geometry: KmlGeometry<f64>,
    name: Option<&str>,
    out: &mut Vec<NamedPolygon>,
) {
    match geometry {
        KmlGeometry::Polygon(polygon) => out.push(NamedPolygon::new(
            name.map(str::to_string),
            Polygon::from(polygon),
        )),
        KmlGeometry::MultiGeometry(multi) => multi
            .geometries
            .into_iter()
            .for_each(|g| collect_geometry(g, name, out)),
        _ => {}
    }
}

/// Builds polygons straight from `<coordinates>` text.
///
/// Rings under `<innerBoundaryIs>` become holes; every other ring inside a
/// `<Polygon>` is the outer boundary. The enclosing placemark's `<name>`
/// becomes the polygon name. Invalid rings are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualExtractor;

impl KmlConverter for ManualExtractor {
    fn convert(&self, doc: &KmlDocument) -> Result<Geometry, KmlError> {
        let mut reader = Reader::from_str(doc.text());
        reader.config_mut().trim_text(true);

        let mut path: Vec<String> = Vec::new();
        let mut text = String::new();
        let mut placemark_name: Option<String> = None;
        let mut outer: Option<LineString<f64>> = None;
        let mut inner: Vec<LineString<f64>> = Vec::new();
        let mut polygons = Vec::new();
        let mut skipped_rings = 0usize;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    match name.as_str() {
                        "Placemark" => placemark_name = None,
                        "Polygon" => {
                            outer = None;
                            inner.clear();
                        }
                        _ => {}
                    }
                    text.clear();
                    path.push(name);
                }
                Ok(Event::Text(t)) => {
                    let unescaped = t
                        .unescape()
                        .map_err(|e| KmlError::Conversion(format!("bad text node: {}", e)))?;
                    text.push_str(&unescaped);
                }
                Ok(Event::CData(c)) => {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
                Ok(Event::End(_)) => {
                    let Some(name) = path.pop() else { continue };
                    let parent = path.last().map(String::as_str);
                    match name.as_str() {
                        "name" if parent == Some("Placemark") => {
                            placemark_name = Some(text.trim().to_string());
                        }
                        "coordinates" if path.iter().any(|p| p == "Polygon") => {
                            match parse_coordinates(&text).and_then(|positions| {
                                ring_from_positions(positions).map_err(|e| e.to_string())
                            }) {
                                Ok(ring) if path.iter().any(|p| p == "innerBoundaryIs") => {
                                    inner.push(ring)
                                }
                                Ok(ring) => outer = Some(ring),
                                Err(reason) => {
                                    skipped_rings += 1;
                                    trace!(reason = %reason, "Skipping invalid KML ring");
                                }
                            }
                        }
                        "Polygon" => {
                            if let Some(exterior) = outer.take() {
                                polygons.push(NamedPolygon::new(
                                    placemark_name.clone(),
                                    Polygon::new(exterior, std::mem::take(&mut inner)),
                                ));
                            }
                        }
                        _ => {}
                    }
                    text.clear();
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(KmlError::Conversion(format!("XML error: {}", e))),
            }
        }

        if skipped_rings > 0 {
            warn!(skipped_rings, "Manual KML extraction skipped invalid rings");
        }

        Geometry::from_polygons(polygons).ok_or_else(|| {
            KmlError::Conversion("no polygon coordinates found in document".to_string())
        })
    }
}

/// Parses KML coordinate text: whitespace separated `lon,lat[,alt]` tuples.
fn parse_coordinates(text: &str) -> Result<Vec<(f64, f64)>, String> {
    text.split_whitespace()
        .map(|tuple| {
            let mut parts = tuple.split(',');
            let lon = parts.next().and_then(|v| v.trim().parse::<f64>().ok());
            let lat = parts.next().and_then(|v| v.trim().parse::<f64>().ok());
            match (lon, lat) {
                (Some(lon), Some(lat)) => Ok((lon, lat)),
                _ => Err(format!("malformed coordinate tuple '{}'", tuple)),
            }
        })
        .collect()
}

/// Runs the library converter, then manual extraction if the library fails.
pub fn convert_document(
    library: &dyn KmlConverter,
    doc: &KmlDocument,
) -> Result<Geometry, KmlError> {
    match library.convert(doc) {
        Ok(geometry) => Ok(geometry),
        Err(library_error) => {
            warn!(
                error = %library_error,
                "Library KML conversion failed, extracting coordinates manually"
            );
            ManualExtractor.convert(doc).map_err(|manual_error| {
                KmlError::Conversion(format!(
                    "library: {}; manual extraction: {}",
                    library_error, manual_error
                ))
            })
        }
    }
}
