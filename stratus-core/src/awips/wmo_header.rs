//! WMO abbreviated heading parsing
//!
//! Every AWIPS product opens with a WMO header: an optional transmission
//! preamble (SOH and a sequence number), the abbreviated heading
//! `TTAAII CCCC DDHHMM [BBB]`, and the AWIPS identifier line.

use std::io::{Read, Seek, SeekFrom};

use crate::bytes::{get_line, SOH};
use crate::error::DecodeError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WmoHeader {
    /// Transmission sequence number, empty when absent
    pub sequence_number: String,
    /// Data type and area designator (`TTAAII`)
    pub data_type: String,
    /// Issuing office (`CCCC`)
    pub icao: String,
    /// Issuance day/hour/minute (`DDHHMM`)
    pub date_time: String,
    /// Optional indicator group (`BBB`)
    pub bbb_indicator: String,
    /// AWIPS product category (`NNN`)
    pub product_category: String,
    /// AWIPS product designator (`XXX`)
    pub product_designator: String,
}

impl WmoHeader {
    /// Parse a WMO header. On failure the stream position is restored.
    pub fn decode<R: Read + Seek>(is: &mut R) -> Result<Self, DecodeError> {
        let start = is.stream_position().map_err(DecodeError::from_io)?;

        match Self::parse(is) {
            Ok(header) => Ok(header),
            Err(e) => {
                is.seek(SeekFrom::Start(start)).map_err(DecodeError::from_io)?;
                Err(e)
            }
        }
    }

    fn parse<R: Read + Seek>(is: &mut R) -> Result<Self, DecodeError> {
        let mut header = WmoHeader::default();
        let mut line = String::new();

        if !get_line(is, &mut line)? {
            return Err(DecodeError::Truncated);
        }

        // Optional transmission preamble
        if line.as_bytes().first() == Some(&SOH) {
            line = line[1..].trim_start().to_string();
            if line.is_empty() && !get_line(is, &mut line)? {
                return Err(DecodeError::Truncated);
            }
        }

        // Optional sequence number line
        if !line.is_empty()
            && line.len() <= 3
            && line.bytes().all(|b| b.is_ascii_digit())
        {
            header.sequence_number = line.clone();
            if !get_line(is, &mut line)? {
                return Err(DecodeError::Truncated);
            }
        }

        // Abbreviated heading: TTAAII CCCC DDHHMM [BBB]
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 3 || tokens.len() > 4 {
            return Err(DecodeError::Malformed("bad WMO abbreviated heading".into()));
        }
        if tokens[0].len() < 4
            || tokens[0].len() > 6
            || tokens[1].len() != 4
            || tokens[2].len() != 6
            || !tokens[2].bytes().all(|b| b.is_ascii_digit())
        {
            return Err(DecodeError::Malformed("bad WMO abbreviated heading".into()));
        }

        header.data_type = tokens[0].to_string();
        header.icao = tokens[1].to_string();
        header.date_time = tokens[2].to_string();
        if let Some(bbb) = tokens.get(3) {
            header.bbb_indicator = bbb.to_string();
        }

        // AWIPS identifier line
        if !get_line(is, &mut line)? {
            return Err(DecodeError::Truncated);
        }
        let awips_id = line.trim();
        if awips_id.len() < 4
            || awips_id.len() > 6
            || !awips_id.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return Err(DecodeError::Malformed("bad AWIPS identifier".into()));
        }

        header.product_category = awips_id[..3].to_string();
        header.product_designator = awips_id[3..].to_string();

        Ok(header)
    }
}
