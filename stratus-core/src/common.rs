//! Shared radar product types and constants

use serde::{Deserialize, Serialize};

/// Maximum number of data moment gates in a Message 31 radial
pub const MAX_DATA_MOMENT_GATES: usize = 1840;

/// Number of radials in a 0.5 degree azimuth sweep
pub const MAX_0_5_DEGREE_RADIALS: usize = 720;

/// Number of radials in a 1 degree azimuth sweep
pub const MAX_1_DEGREE_RADIALS: usize = 360;

/// WSR-88D product tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RadarProductGroup {
    /// Raw moment data
    Level2,
    /// Derived named products
    Level3,
}

impl RadarProductGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            RadarProductGroup::Level2 => "L2",
            RadarProductGroup::Level3 => "L3",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "L2" => Some(RadarProductGroup::Level2),
            "L3" => Some(RadarProductGroup::Level3),
            _ => None,
        }
    }
}

impl std::fmt::Display for RadarProductGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Azimuth resolution of a radial sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RadialSize {
    /// 0.5 degree radials
    Half,
    /// 1 degree radials
    Full,
}

impl RadialSize {
    /// Number of radials in a full sweep at this resolution
    pub fn radial_count(&self) -> usize {
        match self {
            RadialSize::Half => MAX_0_5_DEGREE_RADIALS,
            RadialSize::Full => MAX_1_DEGREE_RADIALS,
        }
    }

    /// Map the Message 31 azimuth resolution spacing field
    pub fn from_spacing(spacing: u8) -> Option<Self> {
        match spacing {
            1 => Some(RadialSize::Half),
            2 => Some(RadialSize::Full),
            _ => None,
        }
    }
}

/// A geographic position expressed in degrees latitude and longitude.
/// Latitude is positive in the northern hemisphere, longitude is positive in
/// the eastern hemisphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Coordinate {
            latitude,
            longitude,
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Compute the centroid of a set of coordinates by averaging on the unit
/// sphere. Returns (0, 0) for an empty input.
pub fn centroid(coordinates: &[Coordinate]) -> Coordinate {
    if coordinates.is_empty() {
        return Coordinate::new(0.0, 0.0);
    }

    let mut x = 0.0;
    let mut y = 0.0;
    let mut z = 0.0;

    for c in coordinates {
        let lat = c.latitude.to_radians();
        let lon = c.longitude.to_radians();

        x += lat.cos() * lon.cos();
        y += lat.cos() * lon.sin();
        z += lat.sin();
    }

    let n = coordinates.len() as f64;
    x /= n;
    y /= n;
    z /= n;

    let hyp = (x * x + y * y).sqrt();

    Coordinate::new(z.atan2(hyp).to_degrees(), y.atan2(x).to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_group_names_round_trip() {
        for group in [RadarProductGroup::Level2, RadarProductGroup::Level3] {
            assert_eq!(RadarProductGroup::from_name(group.as_str()), Some(group));
        }
        assert_eq!(RadarProductGroup::from_name("L4"), None);
    }

    #[test]
    fn radial_size_from_spacing() {
        assert_eq!(RadialSize::from_spacing(1), Some(RadialSize::Half));
        assert_eq!(RadialSize::from_spacing(2), Some(RadialSize::Full));
        assert_eq!(RadialSize::from_spacing(3), None);
    }

    #[test]
    fn centroid_of_symmetric_points_is_midpoint() {
        let coordinates = [
            Coordinate::new(10.0, -90.0),
            Coordinate::new(-10.0, -90.0),
        ];

        let c = centroid(&coordinates);
        assert!(c.latitude.abs() < 1e-9);
        assert!((c.longitude - -90.0).abs() < 1e-9);
    }
}
