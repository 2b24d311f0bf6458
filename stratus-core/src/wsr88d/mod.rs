//! WSR-88D product decoding.
//!
//! This module contains the decoders for NEXRAD binary products:
//! Level-II archive volumes carrying Message 31 radials, and Level-III
//! product files. [`NexradFileFactory`] sniffs a stream and dispatches to
//! the matching decoder.

pub mod digital_radar_data;
pub mod level2_file;
pub mod level3_file;

pub use digital_radar_data::{
    DataBlockType, DigitalRadarData, ElevationDataBlock, MomentDataBlock, MomentGates,
    RadialDataBlock, VolumeDataBlock,
};
pub use level2_file::{ElevationScan, Level2File};
pub use level3_file::{Level3File, Level3Message, Level3MessageHeader};

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::bytes::{self, SOH};
use crate::common::RadarProductGroup;
use crate::error::DecodeError;

/// RDA message header preceding every message in an archive stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Message size in halfwords, including this header
    pub message_size: u16,
    pub rda_channel: u8,
    pub message_type: u8,
    pub sequence_number: u16,
    pub julian_date: u16,
    pub milliseconds_of_day: u32,
    pub segment_count: u16,
    pub segment_number: u16,
}

impl MessageHeader {
    pub const SIZE: usize = 16;

    pub fn decode<R: Read>(is: &mut R) -> Result<Self, DecodeError> {
        Ok(MessageHeader {
            message_size: bytes::read_u16(is)?,        // 0-1
            rda_channel: bytes::read_u8(is)?,          // 2
            message_type: bytes::read_u8(is)?,         // 3
            sequence_number: bytes::read_u16(is)?,     // 4-5
            julian_date: bytes::read_u16(is)?,         // 6-7
            milliseconds_of_day: bytes::read_u32(is)?, // 8-11
            segment_count: bytes::read_u16(is)?,       // 12-13
            segment_number: bytes::read_u16(is)?,      // 14-15
        })
    }
}

/// Convert a modified Julian date (day 1 = 1970-01-01) and milliseconds of
/// day into a UTC time point.
pub fn scan_time(modified_julian_date: u32, milliseconds_of_day: u32) -> DateTime<Utc> {
    let days = u64::from(modified_julian_date.saturating_sub(1));
    let seconds = days * 86_400 + u64::from(milliseconds_of_day / 1000);
    let nanos = (milliseconds_of_day % 1000) * 1_000_000;

    DateTime::<Utc>::from_timestamp(seconds as i64, nanos).unwrap_or_default()
}

/// A decoded NEXRAD product file
#[derive(Debug, Clone)]
pub enum NexradFile {
    Level2(Level2File),
    Level3(Level3File),
}

impl NexradFile {
    /// Radar site identifier this file belongs to
    pub fn radar_id(&self) -> String {
        match self {
            NexradFile::Level2(file) => file.icao().to_string(),
            NexradFile::Level3(file) => file.radar_id(),
        }
    }

    pub fn group(&self) -> RadarProductGroup {
        match self {
            NexradFile::Level2(_) => RadarProductGroup::Level2,
            NexradFile::Level3(_) => RadarProductGroup::Level3,
        }
    }

    /// Product code for Level-III files, empty for Level-II
    pub fn product(&self) -> &str {
        match self {
            NexradFile::Level2(_) => "",
            NexradFile::Level3(file) => file.product(),
        }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        match self {
            NexradFile::Level2(file) => file.start_time(),
            NexradFile::Level3(file) => file.time(),
        }
    }

    pub fn level2(&self) -> Option<&Level2File> {
        match self {
            NexradFile::Level2(file) => Some(file),
            NexradFile::Level3(_) => None,
        }
    }

    pub fn level3(&self) -> Option<&Level3File> {
        match self {
            NexradFile::Level3(file) => Some(file),
            NexradFile::Level2(_) => None,
        }
    }
}

/// Sniffs a stream and dispatches to the matching product decoder
pub struct NexradFileFactory;

impl NexradFileFactory {
    /// Decode a NEXRAD product from a stream. The stream position is
    /// restored before dispatching, so decoders see the file from its start.
    pub fn create<R: Read + Seek>(is: &mut R) -> Result<NexradFile, DecodeError> {
        let start = is.stream_position().map_err(DecodeError::from_io)?;

        let mut magic = [0u8; 4];
        bytes::read_exact(is, &mut magic)?;
        is.seek(SeekFrom::Start(start)).map_err(DecodeError::from_io)?;

        if &magic == b"AR2V" {
            Level2File::decode(is).map(NexradFile::Level2)
        } else if magic[0] == SOH || magic[0].is_ascii_uppercase() || magic[0].is_ascii_digit() {
            Level3File::decode(is).map(NexradFile::Level3)
        } else {
            log::warn!("Unrecognized file header: {:02x?}", magic);
            Err(DecodeError::Unsupported("unrecognized file format".into()))
        }
    }

    pub fn create_from_path<P: AsRef<Path>>(path: P) -> Result<NexradFile, DecodeError> {
        let file = std::fs::File::open(path).map_err(DecodeError::from_io)?;
        let mut reader = std::io::BufReader::new(file);
        Self::create(&mut reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn scan_time_epoch() {
        let time = scan_time(1, 0);
        assert_eq!(time, DateTime::<Utc>::from_timestamp(0, 0).unwrap());

        // Day 2 at 12:00:00.500
        let time = scan_time(2, 43_200_500);
        assert_eq!(
            time,
            DateTime::<Utc>::from_timestamp(86_400 + 43_200, 500_000_000).unwrap()
        );
    }

    #[test]
    fn message_header_layout() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&1216u16.to_be_bytes());
        raw.push(0); // channel
        raw.push(31); // type
        raw.extend_from_slice(&7u16.to_be_bytes());
        raw.extend_from_slice(&20_454u16.to_be_bytes());
        raw.extend_from_slice(&43_200_000u32.to_be_bytes());
        raw.extend_from_slice(&1u16.to_be_bytes());
        raw.extend_from_slice(&1u16.to_be_bytes());

        let header = MessageHeader::decode(&mut Cursor::new(raw)).unwrap();
        assert_eq!(header.message_size, 1216);
        assert_eq!(header.message_type, 31);
        assert_eq!(header.milliseconds_of_day, 43_200_000);
    }

    #[test]
    fn factory_rejects_unknown_magic() {
        let mut cursor = Cursor::new([0xde, 0xad, 0xbe, 0xef, 0x00, 0x00]);
        assert!(matches!(
            NexradFileFactory::create(&mut cursor),
            Err(DecodeError::Unsupported(_))
        ));
    }
}
