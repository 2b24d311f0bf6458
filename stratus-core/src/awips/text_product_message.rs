//! AWIPS text product parsing
//!
//! A text product is a WMO header followed by segments. Each segment may
//! carry a header (UGC line, VTEC strings, UGC names, issuance date/time)
//! and product content terminated by `$$`, ETX, or end of stream.
//!
//! The parsers here rewind: when a structure is not recognized, the stream
//! position is restored to where the attempt began.

use std::io::{Read, Seek, SeekFrom};
use std::sync::LazyLock;

use regex::Regex;

use crate::bytes::{get_line, peek_byte, ETX};
use crate::error::DecodeError;

use super::pvtec::PVtec;
use super::wmo_header::WmoHeader;

// Issuance date/time takes one of the following forms:
// * <hhmm>_xM_<tz>_day_mon_<dd>_year
// * <hhmm>_UTC_day_mon_<dd>_year
// Look for hhmm (xM|UTC) to key the date/time string
static RE_DATE_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{3,4} ([AP]M|UTC)").expect("date/time regex is valid"));

// UGC takes the form SSFNNN-NNN>NNN-SSFNNN-DDHHMM- (NWSI 10-1702)
static RE_UGC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}[CZ]([0-9]{3})?[->]").expect("UGC regex is valid"));

// H-VTEC takes the form /nwsli.s.ic.yymmddThhnnZB.yymmddThhnnZC.yymmddThhnnZE.fr/
static RE_HVTEC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/[A-Z0-9]{5}\.").expect("H-VTEC regex is valid"));

/// A P-VTEC string with its optional H-VTEC companion line
#[derive(Debug, Clone)]
pub struct Vtec {
    pub pvtec: PVtec,
    pub hvtec: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SegmentHeader {
    pub ugc_string: String,
    pub vtec_strings: Vec<Vtec>,
    pub ugc_names: Vec<String>,
    pub issuance_date_time: String,
}

#[derive(Debug, Clone, Default)]
pub struct Segment {
    pub header: Option<SegmentHeader>,
    pub product_content: Vec<String>,
}

/// A parsed AWIPS text product
#[derive(Debug, Clone)]
pub struct TextProductMessage {
    pub wmo_header: WmoHeader,
    pub mnd_header: Vec<String>,
    pub segments: Vec<Segment>,
}

impl TextProductMessage {
    pub fn decode<R: Read + Seek>(is: &mut R) -> Result<Self, DecodeError> {
        let wmo_header = WmoHeader::decode(is)?;

        let mut mnd_header = Vec::new();
        let mut segments = Vec::new();

        let mut index = 0usize;
        loop {
            if peek_byte(is)?.is_none() {
                break;
            }
            if index != 0 && try_parse_end_of_product(is)? {
                break;
            }

            let mut header = None;

            if index == 0 {
                if peek_byte(is)? != Some(b'\r') {
                    header = try_parse_segment_header(is)?;
                }
                skip_blank_lines(is)?;

                mnd_header = try_parse_mnd_header(is)?;
                skip_blank_lines(is)?;
            }

            if header.is_none() {
                header = try_parse_segment_header(is)?;
                skip_blank_lines(is)?;
            }

            let product_content = parse_product_content(is)?;
            skip_blank_lines(is)?;

            if header.is_some() || !product_content.is_empty() {
                segments.push(Segment {
                    header,
                    product_content,
                });
            }

            index += 1;
        }

        Ok(TextProductMessage {
            wmo_header,
            mnd_header,
            segments,
        })
    }
}

fn parse_product_content<R: Read + Seek>(is: &mut R) -> Result<Vec<String>, DecodeError> {
    let mut content = Vec::new();
    let mut line = String::new();

    while !matches!(peek_byte(is)?, None | Some(ETX)) {
        if !get_line(is, &mut line)? {
            break;
        }

        if line.starts_with("$$") {
            // End of Product or Product Segment Code
            break;
        }

        content.push(line.clone());
    }

    while content.last().is_some_and(|l| l.is_empty()) {
        content.pop();
    }

    Ok(content)
}

fn skip_blank_lines<R: Read + Seek>(is: &mut R) -> Result<(), DecodeError> {
    let mut line = String::new();

    while peek_byte(is)? == Some(b'\r') {
        get_line(is, &mut line)?;
    }

    Ok(())
}

/// Detect the end of the product: an ETX, end of stream, or an optional
/// forecast identifier line followed by either. On a miss the stream is
/// rewound to where it was.
fn try_parse_end_of_product<R: Read + Seek>(is: &mut R) -> Result<bool, DecodeError> {
    let start = is.stream_position().map_err(DecodeError::from_io)?;
    let mut line = String::new();

    let at_end = |is: &mut R| -> Result<bool, DecodeError> {
        match peek_byte(is)? {
            Some(ETX) => {
                is.seek(SeekFrom::Current(1)).map_err(DecodeError::from_io)?;
                Ok(true)
            }
            None => Ok(true),
            _ => Ok(false),
        }
    };

    if at_end(is)? {
        return Ok(true);
    }

    // Optional forecast identifier
    get_line(is, &mut line)?;
    skip_blank_lines(is)?;

    if at_end(is)? {
        return Ok(true);
    }

    is.seek(SeekFrom::Start(start)).map_err(DecodeError::from_io)?;
    Ok(false)
}

/// The MND header is a block of lines ending with an issuance date/time
/// line. Anything else is not an MND header and is rewound.
fn try_parse_mnd_header<R: Read + Seek>(is: &mut R) -> Result<Vec<String>, DecodeError> {
    let start = is.stream_position().map_err(DecodeError::from_io)?;
    let mut mnd_header = Vec::new();
    let mut line = String::new();

    while !matches!(peek_byte(is)?, None | Some(b'\r') | Some(ETX)) {
        if !get_line(is, &mut line)? {
            break;
        }
        mnd_header.push(line.clone());
    }

    if mnd_header
        .last()
        .is_some_and(|last| !RE_DATE_TIME.is_match(last))
    {
        // MND Header should end with an Issuance Date/Time Line
        mnd_header.clear();
    }

    if mnd_header.is_empty() {
        is.seek(SeekFrom::Start(start)).map_err(DecodeError::from_io)?;
    }

    Ok(mnd_header)
}

fn try_parse_segment_header<R: Read + Seek>(
    is: &mut R,
) -> Result<Option<SegmentHeader>, DecodeError> {
    let start = is.stream_position().map_err(DecodeError::from_io)?;
    let mut line = String::new();

    get_line(is, &mut line)?;

    if !RE_UGC.is_match(&line) {
        is.seek(SeekFrom::Start(start)).map_err(DecodeError::from_io)?;
        return Ok(None);
    }

    let mut header = SegmentHeader {
        ugc_string: line.clone(),
        ..Default::default()
    };

    while let Some(vtec) = try_parse_vtec(is)? {
        header.vtec_strings.push(vtec);
    }

    while !matches!(peek_byte(is)?, None | Some(b'\r') | Some(ETX)) {
        if !get_line(is, &mut line)? {
            break;
        }
        if RE_DATE_TIME.is_match(&line) {
            header.issuance_date_time = line.clone();
            break;
        }
        header.ugc_names.push(line.clone());
    }

    Ok(Some(header))
}

fn try_parse_vtec<R: Read + Seek>(is: &mut R) -> Result<Option<Vtec>, DecodeError> {
    let start = is.stream_position().map_err(DecodeError::from_io)?;
    let mut line = String::new();

    get_line(is, &mut line)?;

    if !PVtec::is_keyed(&line) {
        is.seek(SeekFrom::Start(start)).map_err(DecodeError::from_io)?;
        return Ok(None);
    }

    let pvtec = match PVtec::parse(&line) {
        Ok(pvtec) => pvtec,
        Err(e) => {
            log::warn!("Discarding invalid P-VTEC string: {}", e);
            is.seek(SeekFrom::Start(start)).map_err(DecodeError::from_io)?;
            return Ok(None);
        }
    };

    // A P-VTEC line may be followed by a single H-VTEC line
    let after_pvtec = is.stream_position().map_err(DecodeError::from_io)?;
    get_line(is, &mut line)?;

    let hvtec = if RE_HVTEC.is_match(&line) {
        Some(line.clone())
    } else {
        is.seek(SeekFrom::Start(after_pvtec))
            .map_err(DecodeError::from_io)?;
        None
    };

    Ok(Some(Vtec { pvtec, hvtec }))
}
