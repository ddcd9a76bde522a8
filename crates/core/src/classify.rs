//! Request classification.
//!
//! Every request maps to exactly one [`Category`]. The mapping is a pure
//! function of the request mode and URL shape, evaluated in this order:
//!
//! 1. `navigation` - request mode is a page navigation
//! 2. `data` - same origin, path ends in a dataset extension
//! 3. `static` - same origin, path ends in an app-shell asset extension
//! 4. `tile-or-cdn` - host matches the tile/CDN allow-list (suffix, case-insensitive)
//! 5. `other` - everything else

use serde::{Deserialize, Serialize};
use url::{Origin, Url};

use crate::config::AppConfig;
use crate::model::{Request, RequestMode};

/// Classification bucket; determines the retrieval strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Static,
    Data,
    TileOrCdn,
    Navigation,
    Other,
}

impl Category {
    /// Categories that own a storage partition.
    pub const STORED: [Category; 3] = [Category::Static, Category::Data, Category::TileOrCdn];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Static => "static",
            Category::Data => "data",
            Category::TileOrCdn => "tile-or-cdn",
            Category::Navigation => "navigation",
            Category::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "static" => Some(Category::Static),
            "data" => Some(Category::Data),
            "tile-or-cdn" => Some(Category::TileOrCdn),
            "navigation" => Some(Category::Navigation),
            "other" => Some(Category::Other),
            _ => None,
        }
    }

    /// Prefix of the partition name (`{prefix}-{version}`), if the category stores entries.
    pub fn partition_prefix(&self) -> Option<&'static str> {
        match self {
            Category::Static => Some("static"),
            Category::Data => Some("data"),
            Category::TileOrCdn => Some("tiles"),
            Category::Navigation | Category::Other => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// URL classifier built from the deployed configuration.
#[derive(Debug, Clone)]
pub struct Classifier {
    origin: Origin,
    static_extensions: Vec<String>,
    data_extensions: Vec<String>,
    tile_hosts: Vec<String>,
}

impl Classifier {
    pub fn new(
        origin: &Url, static_extensions: &[String], data_extensions: &[String], tile_hosts: &[String],
    ) -> Self {
        let lower = |v: &[String]| v.iter().map(|s| s.trim_start_matches('.').to_ascii_lowercase()).collect();
        Self {
            origin: origin.origin(),
            static_extensions: lower(static_extensions),
            data_extensions: lower(data_extensions),
            tile_hosts: lower(tile_hosts),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.origin, &config.static_extensions, &config.data_extensions, &config.tile_hosts)
    }

    /// Classify an intercepted request. Navigation mode wins over URL shape.
    pub fn classify(&self, request: &Request) -> Category {
        if request.mode == RequestMode::Navigate {
            return Category::Navigation;
        }
        self.classify_url(&request.url)
    }

    /// Classify by URL shape alone.
    pub fn classify_url(&self, url: &Url) -> Category {
        if self.is_same_origin(url) {
            if let Some(ext) = path_extension(url) {
                if self.data_extensions.contains(&ext) {
                    return Category::Data;
                }
                if self.static_extensions.contains(&ext) {
                    return Category::Static;
                }
            }
            return Category::Other;
        }

        if self.is_tile_host(url) {
            return Category::TileOrCdn;
        }

        Category::Other
    }

    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin
    }

    fn is_tile_host(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.tile_hosts.iter().any(|allowed| {
            host == *allowed
                || (host.len() > allowed.len()
                    && host.ends_with(allowed.as_str())
                    && host.as_bytes()[host.len() - allowed.len() - 1] == b'.')
        })
    }
}

/// Lowercased extension of the last path segment, if any.
fn path_extension(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    let (_, ext) = last.rsplit_once('.')?;
    if ext.is_empty() { None } else { Some(ext.to_ascii_lowercase()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::from_config(&AppConfig::default())
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn origin(path: &str) -> Url {
        AppConfig::default().origin.join(path).unwrap()
    }

    #[test]
    fn test_static_assets() {
        let c = classifier();
        for path in ["index.html", "app.js", "style.css", "manifest.webmanifest", "icons/icon-192.png", "favicon.ico"] {
            assert_eq!(c.classify_url(&origin(path)), Category::Static, "{path}");
        }
    }

    #[test]
    fn test_dataset() {
        let c = classifier();
        assert_eq!(c.classify_url(&origin("OTN.geojson")), Category::Data);
        assert_eq!(c.classify_url(&origin("data/Lakes.GeoJSON")), Category::Data);
    }

    #[test]
    fn test_same_origin_without_extension_is_other() {
        let c = classifier();
        assert_eq!(c.classify_url(&origin("api/status")), Category::Other);
        assert_eq!(c.classify_url(&origin("")), Category::Other);
    }

    #[test]
    fn test_cross_origin_asset_is_not_static() {
        let c = classifier();
        assert_eq!(c.classify_url(&url("https://evil.example.com/app.js")), Category::Other);
    }

    #[test]
    fn test_tile_hosts_suffix_match() {
        let c = classifier();
        assert_eq!(c.classify_url(&url("https://tile.openstreetmap.org/5/10/12.png")), Category::TileOrCdn);
        assert_eq!(c.classify_url(&url("https://a.tile.openstreetmap.org/5/10/12.png")), Category::TileOrCdn);
        assert_eq!(c.classify_url(&url("https://A.TILE.OpenStreetMap.org/1/1/1.png")), Category::TileOrCdn);
        assert_eq!(c.classify_url(&url("https://unpkg.com/leaflet@1.9.4/dist/leaflet.js")), Category::TileOrCdn);
    }

    #[test]
    fn test_tile_host_requires_label_boundary() {
        let c = classifier();
        assert_eq!(c.classify_url(&url("https://nottile.openstreetmap.org.evil.com/x.png")), Category::Other);
        assert_eq!(c.classify_url(&url("https://xunpkg.com/x.js")), Category::Other);
    }

    #[test]
    fn test_navigation_checked_first() {
        let c = classifier();
        let req = Request::navigate(origin("index.html"));
        assert_eq!(c.classify(&req), Category::Navigation);

        let req = Request::get(origin("index.html"));
        assert_eq!(c.classify(&req), Category::Static);
    }

    #[test]
    fn test_classification_is_stable() {
        let c = classifier();
        let u = url("https://tile.opentopomap.org/3/4/5.png");
        assert_eq!(c.classify_url(&u), c.classify_url(&u));
        assert_eq!(classifier().classify_url(&u), c.classify_url(&u));
    }

    #[test]
    fn test_partition_prefixes() {
        assert_eq!(Category::Static.partition_prefix(), Some("static"));
        assert_eq!(Category::Data.partition_prefix(), Some("data"));
        assert_eq!(Category::TileOrCdn.partition_prefix(), Some("tiles"));
        assert_eq!(Category::Navigation.partition_prefix(), None);
        assert_eq!(Category::Other.partition_prefix(), None);
    }

    #[test]
    fn test_category_parse() {
        for c in [Category::Static, Category::Data, Category::TileOrCdn, Category::Navigation, Category::Other] {
            assert_eq!(Category::parse(c.as_str()), Some(c));
        }
    }
}
