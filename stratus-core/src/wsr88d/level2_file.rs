//! Level-II archive volume (`AR2V`) decoding
//!
//! An archive volume is a 24-byte volume header followed by message records.
//! Message 31 records are variable length; every other message type occupies
//! a fixed 2432-byte record. Radials are grouped into elevation scans by
//! their elevation number.

use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::bytes;
use crate::error::DecodeError;

use super::digital_radar_data::{DataBlockType, DigitalRadarData};
use super::{scan_time, MessageHeader};

/// Fixed record size for message types other than 31, including the CTM pad
const LEGACY_RECORD_SIZE: u64 = 2432;

/// CTM padding preceding each message header
const CTM_HEADER_SIZE: usize = 12;

/// Archive volume header
#[derive(Debug, Clone)]
pub struct VolumeHeader {
    /// Tape filename field, e.g. `AR2V0006.001`
    pub tape_filename: String,
    pub julian_date: u32,
    pub milliseconds_of_day: u32,
    pub icao: String,
}

/// All radials of a single elevation cut
#[derive(Debug, Clone)]
pub struct ElevationScan {
    pub elevation_number: u8,
    pub radials: Vec<Arc<DigitalRadarData>>,
}

impl ElevationScan {
    /// Elevation angle of this cut, taken from its first radial
    pub fn elevation_angle(&self) -> f32 {
        self.radials
            .first()
            .map(|radial| radial.elevation_angle)
            .unwrap_or_default()
    }

    /// Whether any radial of this cut carries the given moment block
    pub fn contains_block(&self, block_type: DataBlockType) -> bool {
        self.radials
            .iter()
            .any(|radial| radial.moment_block(block_type).is_some())
    }
}

/// A decoded Level-II archive volume
#[derive(Debug, Clone)]
pub struct Level2File {
    volume_header: VolumeHeader,
    scans: BTreeMap<u8, Arc<ElevationScan>>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

impl Level2File {
    pub fn decode<R: Read + Seek>(is: &mut R) -> Result<Self, DecodeError> {
        log::debug!("Decoding Level 2 archive volume");

        let volume_header = Self::decode_volume_header(is)?;

        // Compressed LDM records carry a 4-byte control word followed by a
        // bzip2 stream. The decoder only accepts uncompressed volumes.
        let position = is.stream_position().map_err(DecodeError::from_io)?;
        let mut probe = [0u8; 8];
        if bytes::try_read_exact(is, &mut probe).unwrap_or(false) && &probe[4..7] == b"BZh" {
            log::warn!("Compressed archive volumes are not supported");
            return Err(DecodeError::Unsupported(
                "bzip2-compressed archive volume".into(),
            ));
        }
        is.seek(SeekFrom::Start(position))
            .map_err(DecodeError::from_io)?;

        let mut radials: Vec<Arc<DigitalRadarData>> = Vec::new();

        loop {
            let record_start = is.stream_position().map_err(DecodeError::from_io)?;

            let mut ctm = [0u8; CTM_HEADER_SIZE];
            if !bytes::try_read_exact(is, &mut ctm)? {
                break;
            }

            let header = MessageHeader::decode(is)?;

            if header.message_type == 31 {
                radials.push(Arc::new(DigitalRadarData::decode(header, is)?));
            } else {
                is.seek(SeekFrom::Start(record_start + LEGACY_RECORD_SIZE))
                    .map_err(DecodeError::from_io)?;
            }
        }

        log::debug!("Decoded {} radials", radials.len());

        let mut grouped: BTreeMap<u8, Vec<Arc<DigitalRadarData>>> = BTreeMap::new();
        for radial in radials {
            grouped
                .entry(radial.elevation_number)
                .or_default()
                .push(radial);
        }

        let scans: BTreeMap<u8, Arc<ElevationScan>> = grouped
            .into_iter()
            .map(|(elevation_number, radials)| {
                (
                    elevation_number,
                    Arc::new(ElevationScan {
                        elevation_number,
                        radials,
                    }),
                )
            })
            .collect();

        let volume_time = scan_time(volume_header.julian_date, volume_header.milliseconds_of_day);
        let times: Vec<DateTime<Utc>> = scans
            .values()
            .flat_map(|scan| scan.radials.iter())
            .map(|radial| radial.collection_time_point())
            .collect();

        let start_time = times.iter().min().copied().unwrap_or(volume_time);
        let end_time = times.iter().max().copied().unwrap_or(volume_time);

        Ok(Level2File {
            volume_header,
            scans,
            start_time,
            end_time,
        })
    }

    fn decode_volume_header<R: Read>(is: &mut R) -> Result<VolumeHeader, DecodeError> {
        let mut name = [0u8; 12];
        bytes::read_exact(is, &mut name)?;

        if &name[0..4] != b"AR2V" {
            return Err(DecodeError::Malformed("bad volume header magic".into()));
        }

        let tape_filename = std::str::from_utf8(&name)
            .map_err(|_| DecodeError::InvalidString)?
            .to_string();

        let julian_date = bytes::read_u32(is)?;
        let milliseconds_of_day = bytes::read_u32(is)?;

        let mut icao = [0u8; 4];
        bytes::read_exact(is, &mut icao)?;
        let icao = std::str::from_utf8(&icao)
            .map_err(|_| DecodeError::InvalidString)?
            .trim_end()
            .to_string();

        Ok(VolumeHeader {
            tape_filename,
            julian_date,
            milliseconds_of_day,
            icao,
        })
    }

    pub fn volume_header(&self) -> &VolumeHeader {
        &self.volume_header
    }

    pub fn icao(&self) -> &str {
        &self.volume_header.icao
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    /// Elevation angles of every cut in the volume, in cut order
    pub fn elevation_cuts(&self) -> Vec<f32> {
        self.scans
            .values()
            .map(|scan| scan.elevation_angle())
            .collect()
    }

    /// Select the elevation scan nearest the requested elevation angle that
    /// carries the given moment block. Returns the scan, the chosen cut
    /// angle, and the full cut list.
    pub fn get_elevation_scan(
        &self,
        block_type: DataBlockType,
        elevation: f32,
        _time: DateTime<Utc>,
    ) -> Option<(Arc<ElevationScan>, f32, Vec<f32>)> {
        let cuts = self.elevation_cuts();

        let scan = self
            .scans
            .values()
            .filter(|scan| scan.contains_block(block_type))
            .min_by(|a, b| {
                let da = (a.elevation_angle() - elevation).abs();
                let db = (b.elevation_angle() - elevation).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })?;

        Some((Arc::clone(scan), scan.elevation_angle(), cuts))
    }
}
