//! Stratus Core - Platform-independent NEXRAD product decoding
//!
//! This crate contains pure decoding logic for WSR-88D radar products and
//! AWIPS text products. It has no networking or scheduling dependencies and
//! operates on caller-supplied `Read + Seek` streams.
//!
//! # Supported Inputs
//!
//! - **Level-II archive volumes** (`AR2V` files carrying Digital Radar Data
//!   Message 31 radials)
//! - **Level-III product files** (WMO header followed by a product message)
//! - **AWIPS text products** (WMO header, MND header, UGC / VTEC segments)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use stratus_core::wsr88d::NexradFileFactory;
//!
//! let file = File::open("KLSX20250101_000321_V06").unwrap();
//! let mut reader = BufReader::new(file);
//! match NexradFileFactory::create(&mut reader) {
//!     Ok(nexrad_file) => println!("Decoded {}", nexrad_file.radar_id()),
//!     Err(e) => println!("Decode error: {}", e),
//! }
//! ```

pub mod awips;
pub mod bytes;
pub mod common;
pub mod error;
pub mod wsr88d;

// Re-export commonly used types
pub use common::{Coordinate, RadarProductGroup, RadialSize};
pub use error::DecodeError;
