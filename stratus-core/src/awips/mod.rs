//! AWIPS text product decoding.
//!
//! Covers the WMO header shared by text and Level-III products, P-VTEC
//! strings, impact-based warning threat categories, and the segmented text
//! product format.

pub mod impact_based_warnings;
pub mod pvtec;
pub mod text_product_message;
pub mod wmo_header;

pub use impact_based_warnings::ThreatCategory;
pub use pvtec::PVtec;
pub use text_product_message::{Segment, SegmentHeader, TextProductMessage, Vtec};
pub use wmo_header::WmoHeader;
