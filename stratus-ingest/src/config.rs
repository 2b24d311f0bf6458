//! Radar site configuration
//!
//! A static table of radar sites, keyed by site identifier. Sites that are
//! not in the table still get a manager, backed by a default site at the
//! origin, so a viewer can load files before the table is complete.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};

/// Embedded radar site table
static RADAR_SITES_JSON: &str = r#"[
  { "id": "KDMX", "name": "Des Moines, IA",     "type": "wsr88d", "latitude": 41.7312, "longitude": -93.7227 },
  { "id": "KDVN", "name": "Davenport, IA",      "type": "wsr88d", "latitude": 41.6117, "longitude": -90.5809 },
  { "id": "KEAX", "name": "Kansas City, MO",    "type": "wsr88d", "latitude": 38.8103, "longitude": -94.2645 },
  { "id": "KLSX", "name": "St. Louis, MO",      "type": "wsr88d", "latitude": 38.6986, "longitude": -90.6828 },
  { "id": "KSGF", "name": "Springfield, MO",    "type": "wsr88d", "latitude": 37.2352, "longitude": -93.4006 },
  { "id": "KTLX", "name": "Oklahoma City, OK",  "type": "wsr88d", "latitude": 35.3331, "longitude": -97.2778 },
  { "id": "KILX", "name": "Lincoln, IL",        "type": "wsr88d", "latitude": 40.1505, "longitude": -89.3368 },
  { "id": "KPAH", "name": "Paducah, KY",        "type": "wsr88d", "latitude": 37.0683, "longitude": -88.7720 },
  { "id": "TSTL", "name": "St. Louis TDWR",     "type": "tdwr",   "latitude": 38.8047, "longitude": -90.4886 },
  { "id": "TMCI", "name": "Kansas City TDWR",   "type": "tdwr",   "latitude": 39.4983, "longitude": -94.7418 }
]"#;

static RADAR_SITES: LazyLock<HashMap<String, Arc<RadarSite>>> = LazyLock::new(|| {
    let sites: Vec<RadarSite> = match serde_json::from_str(RADAR_SITES_JSON) {
        Ok(sites) => sites,
        Err(e) => {
            log::error!("Could not parse radar site table: {}", e);
            Vec::new()
        }
    };

    sites
        .into_iter()
        .map(|site| (site.id.clone(), Arc::new(site)))
        .collect()
});

/// A radar site. Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadarSite {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub site_type: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl RadarSite {
    /// Look up a radar site by identifier
    pub fn get(id: &str) -> Option<Arc<RadarSite>> {
        RADAR_SITES.get(id).cloned()
    }

    /// All known radar sites
    pub fn all() -> Vec<Arc<RadarSite>> {
        RADAR_SITES.values().cloned().collect()
    }

    /// Placeholder site used when an identifier is not in the table
    pub fn unknown(id: &str) -> RadarSite {
        RadarSite {
            id: id.to_string(),
            name: String::new(),
            site_type: String::new(),
            latitude: 0.0,
            longitude: 0.0,
        }
    }

    /// Range gate size for this site's radar type
    pub fn gate_size_m(&self) -> f64 {
        if self.site_type == "tdwr" {
            150.0
        } else {
            250.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_site_lookup() {
        let site = RadarSite::get("KLSX").unwrap();
        assert_eq!(site.name, "St. Louis, MO");
        assert_eq!(site.gate_size_m(), 250.0);
    }

    #[test]
    fn tdwr_sites_use_short_gates() {
        let site = RadarSite::get("TSTL").unwrap();
        assert_eq!(site.gate_size_m(), 150.0);
    }

    #[test]
    fn unknown_site_lookup() {
        assert!(RadarSite::get("XXXX").is_none());
        let site = RadarSite::unknown("XXXX");
        assert_eq!(site.id, "XXXX");
        assert_eq!(site.gate_size_m(), 250.0);
    }
}
