//! Base tile providers.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Raster base layer under the field boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BaseTile {
    /// OpenStreetMap
    #[default]
    Street,
    /// Esri World Imagery
    Satellite,
    /// OpenTopoMap
    Terrain,
}

/// Error parsing a base tile name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown base tile '{0}' (expected street, satellite or terrain)")]
pub struct UnknownBaseTile(pub String);

impl BaseTile {
    pub const ALL: [BaseTile; 3] = [BaseTile::Street, BaseTile::Satellite, BaseTile::Terrain];

    /// Slippy-map URL template with `{z}`, `{x}`, `{y}` and optional `{s}` placeholders.
    pub fn url_template(self) -> &'static str {
        match self {
            BaseTile::Street => "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            BaseTile::Satellite => {
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
            }
            BaseTile::Terrain => "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png",
        }
    }

    pub fn attribution(self) -> &'static str {
        match self {
            BaseTile::Street => "© OpenStreetMap contributors",
            BaseTile::Satellite => "Tiles © Esri, Maxar, Earthstar Geographics",
            BaseTile::Terrain => "© OpenStreetMap contributors, SRTM | © OpenTopoMap (CC-BY-SA)",
        }
    }

    /// Highest zoom level the provider serves.
    pub fn max_zoom(self) -> u8 {
        match self {
            BaseTile::Street => 19,
            BaseTile::Satellite => 18,
            BaseTile::Terrain => 17,
        }
    }

    /// Name used in the configuration file.
    pub fn as_str(self) -> &'static str {
        match self {
            BaseTile::Street => "street",
            BaseTile::Satellite => "satellite",
            BaseTile::Terrain => "terrain",
        }
    }

    /// Expands the template for one tile, using subdomain `a`.
    pub fn tile_url(self, z: u8, x: u32, y: u32) -> String {
        self.url_template()
            .replace("{s}", "a")
            .replace("{z}", &z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }
}

impl fmt::Display for BaseTile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BaseTile {
    type Err = UnknownBaseTile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "street" | "streets" | "osm" => Ok(BaseTile::Street),
            "satellite" | "imagery" => Ok(BaseTile::Satellite),
            "terrain" | "topo" => Ok(BaseTile::Terrain),
            _ => Err(UnknownBaseTile(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_and_aliases() {
        assert_eq!("street".parse::<BaseTile>().unwrap(), BaseTile::Street);
        assert_eq!(" Satellite ".parse::<BaseTile>().unwrap(), BaseTile::Satellite);
        assert_eq!("topo".parse::<BaseTile>().unwrap(), BaseTile::Terrain);
        assert!("watercolor".parse::<BaseTile>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for tile in BaseTile::ALL {
            assert_eq!(tile.to_string().parse::<BaseTile>().unwrap(), tile);
        }
    }

    #[test]
    fn test_satellite_template_is_row_major() {
        assert_eq!(
            BaseTile::Satellite.tile_url(3, 4, 5),
            "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/3/5/4"
        );
        assert_eq!(
            BaseTile::Street.tile_url(3, 4, 5),
            "https://a.tile.openstreetmap.org/3/4/5.png"
        );
    }
}
