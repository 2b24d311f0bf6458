//! Geodesic coordinate grids
//!
//! For each radar site the renderer needs a precomputed grid of gate corner
//! coordinates: one grid per azimuth resolution, each a flat array of
//! interleaved (latitude, longitude) pairs sized `radials × gates × 2`.
//! Each index is written exactly once, so the fill parallelizes freely.

use geographiclib_rs::{DirectGeodesic, Geodesic};
use rayon::prelude::*;
use stratus_core::common::MAX_DATA_MOMENT_GATES;
use stratus_core::RadialSize;

use crate::config::RadarSite;

/// Compute the coordinate grid for one azimuth resolution.
///
/// Radial `r` covers the azimuth `r × step − step/2`; gate `g` sits at range
/// `(g + 1) × gate_size` along the WGS-84 geodesic from the site.
pub fn compute_coordinates(site: &RadarSite, radial_size: RadialSize) -> Vec<f32> {
    let gates = MAX_DATA_MOMENT_GATES;
    let radials = radial_size.radial_count();
    let gate_size = site.gate_size_m();

    let geodesic = Geodesic::wgs84();

    let mut coordinates = vec![0f32; radials * gates * 2];

    coordinates
        .par_chunks_mut(2)
        .enumerate()
        .for_each(|(radial_gate, pair)| {
            let gate = radial_gate % gates;
            let radial = radial_gate / gates;

            let angle = match radial_size {
                RadialSize::Half => radial as f64 * 0.5 - 0.25,
                RadialSize::Full => radial as f64 - 0.5,
            };
            let range = (gate + 1) as f64 * gate_size;

            let (latitude, longitude): (f64, f64) =
                geodesic.direct(site.latitude, site.longitude, angle, range);

            pair[0] = latitude as f32;
            pair[1] = longitude as f32;
        });

    coordinates
}
