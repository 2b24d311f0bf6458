//! WSR-88D Digital Radar Data (Message Type 31) decoding
//!
//! A Message 31 record is a fixed big-endian header at offsets 0..31,
//! followed by up to ten 4-byte block pointers, followed by the data blocks
//! themselves. Pointers are relative to the start of the message body and
//! blocks are keyed by a 3-character data name.

use std::io::{Read, Seek, SeekFrom};

use crate::bytes;
use crate::error::DecodeError;

use super::MessageHeader;

/// Data block kinds carried by a Message 31 radial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataBlockType {
    Volume,
    Elevation,
    Radial,
    MomentRef,
    MomentVel,
    MomentSw,
    MomentZdr,
    MomentPhi,
    MomentRho,
    MomentCfp,
    Unknown,
}

impl DataBlockType {
    /// Map the 3-character data name from the wire. The spectrum width name
    /// carries a trailing space.
    pub fn from_name(name: &str) -> Self {
        match name {
            "VOL" => DataBlockType::Volume,
            "ELV" => DataBlockType::Elevation,
            "RAD" => DataBlockType::Radial,
            "REF" => DataBlockType::MomentRef,
            "VEL" => DataBlockType::MomentVel,
            "SW " => DataBlockType::MomentSw,
            "ZDR" => DataBlockType::MomentZdr,
            "PHI" => DataBlockType::MomentPhi,
            "RHO" => DataBlockType::MomentRho,
            "CFP" => DataBlockType::MomentCfp,
            _ => DataBlockType::Unknown,
        }
    }

    pub fn is_moment(&self) -> bool {
        matches!(
            self,
            DataBlockType::MomentRef
                | DataBlockType::MomentVel
                | DataBlockType::MomentSw
                | DataBlockType::MomentZdr
                | DataBlockType::MomentPhi
                | DataBlockType::MomentRho
                | DataBlockType::MomentCfp
        )
    }
}

/// Volume constants block (`VOL`)
#[derive(Debug, Clone)]
pub struct VolumeDataBlock {
    pub data_block_type: String,
    pub data_name: String,
    pub lrtup: u16,
    pub version_number_major: u8,
    pub version_number_minor: u8,
    pub latitude: f32,
    pub longitude: f32,
    pub site_height: i16,
    pub feedhorn_height: u16,
    pub calibration_constant: f32,
    pub horizontal_shv_tx_power: f32,
    pub vertical_shv_tx_power: f32,
    pub system_differential_reflectivity: f32,
    pub initial_system_differential_phase: f32,
    pub volume_coverage_pattern_number: u16,
    pub processing_status: u16,
}

impl VolumeDataBlock {
    fn decode<R: Read>(
        data_block_type: String,
        data_name: String,
        is: &mut R,
    ) -> Result<Self, DecodeError> {
        Ok(VolumeDataBlock {
            data_block_type,
            data_name,
            lrtup: bytes::read_u16(is)?,                            // 4-5
            version_number_major: bytes::read_u8(is)?,              // 6
            version_number_minor: bytes::read_u8(is)?,              // 7
            latitude: bytes::read_f32(is)?,                         // 8-11
            longitude: bytes::read_f32(is)?,                        // 12-15
            site_height: bytes::read_i16(is)?,                      // 16-17
            feedhorn_height: bytes::read_u16(is)?,                  // 18-19
            calibration_constant: bytes::read_f32(is)?,             // 20-23
            horizontal_shv_tx_power: bytes::read_f32(is)?,          // 24-27
            vertical_shv_tx_power: bytes::read_f32(is)?,            // 28-31
            system_differential_reflectivity: bytes::read_f32(is)?, // 32-35
            initial_system_differential_phase: bytes::read_f32(is)?, // 36-39
            volume_coverage_pattern_number: bytes::read_u16(is)?,   // 40-41
            processing_status: bytes::read_u16(is)?,                // 42-43
        })
    }
}

/// Elevation constants block (`ELV`)
#[derive(Debug, Clone)]
pub struct ElevationDataBlock {
    pub data_block_type: String,
    pub data_name: String,
    pub lrtup: u16,
    pub atmos: i16,
    pub calibration_constant: f32,
}

impl ElevationDataBlock {
    fn decode<R: Read>(
        data_block_type: String,
        data_name: String,
        is: &mut R,
    ) -> Result<Self, DecodeError> {
        Ok(ElevationDataBlock {
            data_block_type,
            data_name,
            lrtup: bytes::read_u16(is)?,                // 4-5
            atmos: bytes::read_i16(is)?,                // 6-7
            calibration_constant: bytes::read_f32(is)?, // 8-11
        })
    }
}

/// Radial constants block (`RAD`)
#[derive(Debug, Clone)]
pub struct RadialDataBlock {
    pub data_block_type: String,
    pub data_name: String,
    pub lrtup: u16,
    pub unambiguous_range: u16,
    pub noise_level_horizontal: f32,
    pub noise_level_vertical: f32,
    pub nyquist_velocity: u16,
    pub radial_flags: u16,
    pub calibration_constant_horizontal: f32,
    pub calibration_constant_vertical: f32,
}

impl RadialDataBlock {
    fn decode<R: Read>(
        data_block_type: String,
        data_name: String,
        is: &mut R,
    ) -> Result<Self, DecodeError> {
        Ok(RadialDataBlock {
            data_block_type,
            data_name,
            lrtup: bytes::read_u16(is)?,                           // 4-5
            unambiguous_range: bytes::read_u16(is)?,               // 6-7
            noise_level_horizontal: bytes::read_f32(is)?,          // 8-11
            noise_level_vertical: bytes::read_f32(is)?,            // 12-15
            nyquist_velocity: bytes::read_u16(is)?,                // 16-17
            radial_flags: bytes::read_u16(is)?,                    // 18-19
            calibration_constant_horizontal: bytes::read_f32(is)?, // 20-23
            calibration_constant_vertical: bytes::read_f32(is)?,   // 24-27
        })
    }
}

/// Gate data storage for a moment block. The word size on the wire selects
/// 8-bit or 16-bit gates; any other word size leaves the gates empty.
#[derive(Debug, Clone, Default)]
pub enum MomentGates {
    #[default]
    Empty,
    Word8(Vec<u8>),
    Word16(Vec<u16>),
}

impl MomentGates {
    pub fn len(&self) -> usize {
        match self {
            MomentGates::Empty => 0,
            MomentGates::Word8(v) => v.len(),
            MomentGates::Word16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw gate value widened to 16 bits
    pub fn raw_value(&self, gate: usize) -> Option<u16> {
        match self {
            MomentGates::Empty => None,
            MomentGates::Word8(v) => v.get(gate).map(|g| *g as u16),
            MomentGates::Word16(v) => v.get(gate).copied(),
        }
    }
}

/// Data moment block (`REF`, `VEL`, `SW `, `ZDR`, `PHI`, `RHO`, `CFP`)
#[derive(Debug, Clone)]
pub struct MomentDataBlock {
    pub data_block_type: String,
    pub data_name: String,
    pub number_of_gates: u16,
    pub data_moment_range: u16,
    pub data_moment_range_sample_interval: u16,
    pub tover: u16,
    pub snr_threshold: i16,
    pub control_flags: u8,
    pub data_word_size: u8,
    pub scale: f32,
    pub offset: f32,
    pub gates: MomentGates,
}

impl MomentDataBlock {
    fn decode<R: Read + Seek>(
        data_block_type: String,
        data_name: String,
        is: &mut R,
    ) -> Result<Self, DecodeError> {
        is.seek(SeekFrom::Current(4)).map_err(DecodeError::from_io)?; // 4-7 (reserved)

        let mut block = MomentDataBlock {
            data_block_type,
            data_name,
            number_of_gates: bytes::read_u16(is)?, // 8-9
            data_moment_range: bytes::read_u16(is)?, // 10-11
            data_moment_range_sample_interval: bytes::read_u16(is)?, // 12-13
            tover: bytes::read_u16(is)?,           // 14-15
            snr_threshold: bytes::read_i16(is)?,   // 16-17
            control_flags: bytes::read_u8(is)?,    // 18
            data_word_size: bytes::read_u8(is)?,   // 19
            scale: bytes::read_f32(is)?,           // 20-23
            offset: bytes::read_f32(is)?,          // 24-27
            gates: MomentGates::Empty,
        };

        let gate_count = block.number_of_gates as usize;

        if gate_count <= crate::common::MAX_DATA_MOMENT_GATES {
            match block.data_word_size {
                8 => {
                    let mut gates = vec![0u8; gate_count];
                    bytes::read_exact(is, &mut gates)?;
                    block.gates = MomentGates::Word8(gates);
                }
                16 => {
                    block.gates = MomentGates::Word16(bytes::read_u16_vec(is, gate_count)?);
                }
                other => {
                    log::warn!("Invalid data word size: {}", other);
                }
            }
        } else {
            log::warn!(
                "Invalid number of data moment gates: {}",
                block.number_of_gates
            );
        }

        Ok(block)
    }

    /// Physical value of a gate, or `None` for the below-threshold (0) and
    /// range-folded (1) sentinels.
    pub fn moment_value(&self, gate: usize) -> Option<f32> {
        let raw = self.gates.raw_value(gate)?;
        if raw < 2 || self.scale == 0.0 {
            return None;
        }
        Some((raw as f32 - self.offset) / self.scale)
    }
}

/// A decoded Message 31 radial
#[derive(Debug, Clone)]
pub struct DigitalRadarData {
    header: MessageHeader,
    pub radar_identifier: String,
    pub collection_time: u32,
    pub modified_julian_date: u16,
    pub azimuth_number: u16,
    pub azimuth_angle: f32,
    pub compression_indicator: u8,
    pub radial_length: u16,
    pub azimuth_resolution_spacing: u8,
    pub radial_status: u8,
    pub elevation_number: u8,
    pub cut_sector_number: u8,
    pub elevation_angle: f32,
    pub radial_spot_blanking_status: u8,
    pub azimuth_indexing_mode: u8,
    pub data_block_count: u16,
    pub data_block_pointers: [u32; 10],

    pub volume_data_block: Option<VolumeDataBlock>,
    pub elevation_data_block: Option<ElevationDataBlock>,
    pub radial_data_block: Option<RadialDataBlock>,
    pub moment_ref_data_block: Option<MomentDataBlock>,
    pub moment_vel_data_block: Option<MomentDataBlock>,
    pub moment_sw_data_block: Option<MomentDataBlock>,
    pub moment_zdr_data_block: Option<MomentDataBlock>,
    pub moment_phi_data_block: Option<MomentDataBlock>,
    pub moment_rho_data_block: Option<MomentDataBlock>,
    pub moment_cfp_data_block: Option<MomentDataBlock>,
}

impl DigitalRadarData {
    pub fn new(header: MessageHeader) -> Self {
        DigitalRadarData {
            header,
            radar_identifier: String::new(),
            collection_time: 0,
            modified_julian_date: 0,
            azimuth_number: 0,
            azimuth_angle: 0.0,
            compression_indicator: 0,
            radial_length: 0,
            azimuth_resolution_spacing: 0,
            radial_status: 0,
            elevation_number: 0,
            cut_sector_number: 0,
            elevation_angle: 0.0,
            radial_spot_blanking_status: 0,
            azimuth_indexing_mode: 0,
            data_block_count: 0,
            data_block_pointers: [0; 10],
            volume_data_block: None,
            elevation_data_block: None,
            radial_data_block: None,
            moment_ref_data_block: None,
            moment_vel_data_block: None,
            moment_sw_data_block: None,
            moment_zdr_data_block: None,
            moment_phi_data_block: None,
            moment_rho_data_block: None,
            moment_cfp_data_block: None,
        }
    }

    /// Decode a Message 31 body positioned at the start of the message data
    /// (the byte after the 16-byte message header).
    pub fn decode<R: Read + Seek>(
        header: MessageHeader,
        is: &mut R,
    ) -> Result<Self, DecodeError> {
        let mut message = DigitalRadarData::new(header);
        message.parse(is)?;
        Ok(message)
    }

    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    /// Collection time of this radial
    pub fn collection_time_point(&self) -> chrono::DateTime<chrono::Utc> {
        super::scan_time(self.modified_julian_date as u32, self.collection_time)
    }

    pub fn moment_block(&self, block_type: DataBlockType) -> Option<&MomentDataBlock> {
        match block_type {
            DataBlockType::MomentRef => self.moment_ref_data_block.as_ref(),
            DataBlockType::MomentVel => self.moment_vel_data_block.as_ref(),
            DataBlockType::MomentSw => self.moment_sw_data_block.as_ref(),
            DataBlockType::MomentZdr => self.moment_zdr_data_block.as_ref(),
            DataBlockType::MomentPhi => self.moment_phi_data_block.as_ref(),
            DataBlockType::MomentRho => self.moment_rho_data_block.as_ref(),
            DataBlockType::MomentCfp => self.moment_cfp_data_block.as_ref(),
            _ => None,
        }
    }

    /// Parse the message body into this record. On failure the fields read so
    /// far remain populated for diagnostics.
    pub fn parse<R: Read + Seek>(&mut self, is: &mut R) -> Result<(), DecodeError> {
        log::debug!("Decoding digital radar data (message type 31)");

        let message_start = is.stream_position().map_err(DecodeError::from_io)?;

        let mut radar_id = [0u8; 4];
        bytes::read_exact(is, &mut radar_id)?; // 0-3
        self.radar_identifier = std::str::from_utf8(&radar_id)
            .map_err(|_| DecodeError::InvalidString)?
            .to_string();

        self.collection_time = bytes::read_u32(is)?; // 4-7
        self.modified_julian_date = bytes::read_u16(is)?; // 8-9
        self.azimuth_number = bytes::read_u16(is)?; // 10-11
        self.azimuth_angle = bytes::read_f32(is)?; // 12-15
        self.compression_indicator = bytes::read_u8(is)?; // 16
        is.seek(SeekFrom::Current(1)).map_err(DecodeError::from_io)?; // 17 (reserved)
        self.radial_length = bytes::read_u16(is)?; // 18-19
        self.azimuth_resolution_spacing = bytes::read_u8(is)?; // 20
        self.radial_status = bytes::read_u8(is)?; // 21
        self.elevation_number = bytes::read_u8(is)?; // 22
        self.cut_sector_number = bytes::read_u8(is)?; // 23
        self.elevation_angle = bytes::read_f32(is)?; // 24-27
        self.radial_spot_blanking_status = bytes::read_u8(is)?; // 28
        self.azimuth_indexing_mode = bytes::read_u8(is)?; // 29
        self.data_block_count = bytes::read_u16(is)?; // 30-31

        if !(4..=10).contains(&self.data_block_count) {
            log::warn!("Invalid number of data blocks: {}", self.data_block_count);
            self.data_block_count = 0;
            return Err(DecodeError::Malformed("invalid data block count".into()));
        }
        if self.compression_indicator != 0 {
            log::warn!("Compression not supported");
            self.data_block_count = 0;
            return Err(DecodeError::Unsupported(
                "compressed Message 31 payload".into(),
            ));
        }

        let block_count = self.data_block_count as usize;

        let mut raw_pointers = [0u8; 40];
        bytes::read_exact(is, &mut raw_pointers[..block_count * 4])?;
        for (pointer, raw) in self
            .data_block_pointers
            .iter_mut()
            .zip(raw_pointers.chunks_exact(4))
            .take(block_count)
        {
            *pointer = u32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]);
        }
        bytes::swap_from_be_u32(&mut self.data_block_pointers, block_count);

        let message_limit = u64::from(self.header.message_size) * 2;
        let mut end_position = is.stream_position().map_err(DecodeError::from_io)?;

        for b in 0..block_count {
            let pointer = u64::from(self.data_block_pointers[b]);
            if pointer >= message_limit {
                log::warn!("Data block pointer out of bounds: {}", pointer);
                return Err(DecodeError::Malformed(
                    "data block pointer out of bounds".into(),
                ));
            }

            is.seek(SeekFrom::Start(message_start + pointer))
                .map_err(DecodeError::from_io)?;

            let mut type_name = [0u8; 4];
            bytes::read_exact(is, &mut type_name)?;
            let data_block_type = (type_name[0] as char).to_string();
            let data_name = std::str::from_utf8(&type_name[1..])
                .map_err(|_| DecodeError::InvalidString)?
                .to_string();

            match DataBlockType::from_name(&data_name) {
                DataBlockType::Volume => {
                    self.volume_data_block =
                        Some(VolumeDataBlock::decode(data_block_type, data_name, is)?);
                }
                DataBlockType::Elevation => {
                    self.elevation_data_block =
                        Some(ElevationDataBlock::decode(data_block_type, data_name, is)?);
                }
                DataBlockType::Radial => {
                    self.radial_data_block =
                        Some(RadialDataBlock::decode(data_block_type, data_name, is)?);
                }
                DataBlockType::MomentRef => {
                    self.moment_ref_data_block =
                        Some(MomentDataBlock::decode(data_block_type, data_name, is)?);
                }
                DataBlockType::MomentVel => {
                    self.moment_vel_data_block =
                        Some(MomentDataBlock::decode(data_block_type, data_name, is)?);
                }
                DataBlockType::MomentSw => {
                    self.moment_sw_data_block =
                        Some(MomentDataBlock::decode(data_block_type, data_name, is)?);
                }
                DataBlockType::MomentZdr => {
                    self.moment_zdr_data_block =
                        Some(MomentDataBlock::decode(data_block_type, data_name, is)?);
                }
                DataBlockType::MomentPhi => {
                    self.moment_phi_data_block =
                        Some(MomentDataBlock::decode(data_block_type, data_name, is)?);
                }
                DataBlockType::MomentRho => {
                    self.moment_rho_data_block =
                        Some(MomentDataBlock::decode(data_block_type, data_name, is)?);
                }
                DataBlockType::MomentCfp => {
                    self.moment_cfp_data_block =
                        Some(MomentDataBlock::decode(data_block_type, data_name, is)?);
                }
                DataBlockType::Unknown => {
                    log::warn!("Unknown data name: {:?}", data_name);
                }
            }

            end_position = end_position.max(is.stream_position().map_err(DecodeError::from_io)?);
        }

        self.validate(is, message_start, end_position)
    }

    /// Confirm the declared halfword count covers the bytes consumed, then
    /// leave the stream at the end of the declared message body.
    fn validate<R: Seek>(
        &self,
        is: &mut R,
        message_start: u64,
        end_position: u64,
    ) -> Result<(), DecodeError> {
        let declared_body =
            (u64::from(self.header.message_size) * 2).saturating_sub(MessageHeader::SIZE as u64);
        let consumed = end_position.saturating_sub(message_start);

        if consumed > declared_body {
            log::warn!(
                "Message overran its declared size: consumed {} of {}",
                consumed,
                declared_body
            );
            return Err(DecodeError::Truncated);
        }

        is.seek(SeekFrom::Start(message_start + declared_body))
            .map_err(DecodeError::from_io)?;
        Ok(())
    }
}
