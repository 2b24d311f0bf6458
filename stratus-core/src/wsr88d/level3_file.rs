//! Level-III product file decoding
//!
//! A Level-III product file is a WMO header followed by the product message:
//! an 18-byte message header block and the product-specific payload. The
//! payload is carried opaquely for downstream consumers.

use std::io::{Read, Seek};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::awips::WmoHeader;
use crate::bytes;
use crate::error::DecodeError;

use super::scan_time;

/// Level-III message header block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level3MessageHeader {
    pub message_code: i16,
    /// Modified Julian date (day 1 = 1970-01-01)
    pub date: u16,
    /// Seconds of day
    pub time: u32,
    /// Message length in bytes
    pub length: u32,
    pub source_id: i16,
    pub destination_id: i16,
    pub block_count: u16,
}

impl Level3MessageHeader {
    fn decode<R: Read>(is: &mut R) -> Result<Self, DecodeError> {
        Ok(Level3MessageHeader {
            message_code: bytes::read_i16(is)?,   // 0-1
            date: bytes::read_u16(is)?,           // 2-3
            time: bytes::read_u32(is)?,           // 4-7
            length: bytes::read_u32(is)?,         // 8-11
            source_id: bytes::read_i16(is)?,      // 12-13
            destination_id: bytes::read_i16(is)?, // 14-15
            block_count: bytes::read_u16(is)?,    // 16-17
        })
    }
}

/// A Level-III product message: header block plus opaque payload
#[derive(Debug, Clone)]
pub struct Level3Message {
    pub header: Level3MessageHeader,
    pub payload: Vec<u8>,
}

impl Level3Message {
    pub fn time(&self) -> DateTime<Utc> {
        scan_time(u32::from(self.header.date), self.header.time.saturating_mul(1000))
    }
}

/// A decoded Level-III product file
#[derive(Debug, Clone)]
pub struct Level3File {
    wmo_header: WmoHeader,
    message: Arc<Level3Message>,
}

impl Level3File {
    pub fn decode<R: Read + Seek>(is: &mut R) -> Result<Self, DecodeError> {
        log::debug!("Decoding Level 3 product file");

        let wmo_header = WmoHeader::decode(is)?;
        let header = Level3MessageHeader::decode(is)?;

        let mut payload = Vec::new();
        is.read_to_end(&mut payload).map_err(DecodeError::from_io)?;

        Ok(Level3File {
            wmo_header,
            message: Arc::new(Level3Message { header, payload }),
        })
    }

    pub fn wmo_header(&self) -> &WmoHeader {
        &self.wmo_header
    }

    pub fn message(&self) -> Arc<Level3Message> {
        Arc::clone(&self.message)
    }

    /// Product code, e.g. `N0B`
    pub fn product(&self) -> &str {
        &self.wmo_header.product_category
    }

    /// Radar site the product belongs to, derived from the AWIPS designator
    pub fn radar_id(&self) -> String {
        if self.wmo_header.product_designator.len() == 3 {
            format!("K{}", self.wmo_header.product_designator)
        } else {
            self.wmo_header.icao.clone()
        }
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.message.time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    pub(crate) fn level3_file_bytes(date: u16, time_seconds: u32) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(b"SDUS53 KLSX 010000\r\r\nN0BLSX\r\r\n");
        raw.extend_from_slice(&94i16.to_be_bytes()); // message code
        raw.extend_from_slice(&date.to_be_bytes());
        raw.extend_from_slice(&time_seconds.to_be_bytes());
        raw.extend_from_slice(&64u32.to_be_bytes()); // length
        raw.extend_from_slice(&1i16.to_be_bytes()); // source
        raw.extend_from_slice(&0i16.to_be_bytes()); // destination
        raw.extend_from_slice(&3u16.to_be_bytes()); // blocks
        raw.extend_from_slice(&[0u8; 46]); // payload
        raw
    }

    #[test]
    fn decodes_product_file() {
        let raw = level3_file_bytes(20_454, 43_200);
        let file = Level3File::decode(&mut Cursor::new(raw)).unwrap();

        assert_eq!(file.product(), "N0B");
        assert_eq!(file.radar_id(), "KLSX");
        assert_eq!(file.message().header.message_code, 94);
        assert_eq!(file.time(), scan_time(20_454, 43_200_000));
        assert_eq!(file.message().payload.len(), 46);
    }

    #[test]
    fn truncated_message_header_fails() {
        let raw = b"SDUS53 KLSX 010000\r\r\nN0BLSX\r\r\n\x00\x5e".to_vec();
        assert!(matches!(
            Level3File::decode(&mut Cursor::new(raw)),
            Err(DecodeError::Truncated)
        ));
    }
}
