//! Byte-stream primitives for big-endian wire formats and AWIPS text streams.
//!
//! All multi-byte integers on the WSR-88D wire are network order. Floats are
//! 32-bit IEEE-754 in the same byte order and are swapped by reinterpreting
//! the bits as an unsigned 32-bit value.

use std::io::{Read, Seek, SeekFrom};

use crate::error::DecodeError;

/// End-of-text control byte used as an AWIPS product terminator
pub const ETX: u8 = 0x03;

/// Start-of-heading control byte opening an AWIPS transmission
pub const SOH: u8 = 0x01;

/// Upper bound on a single AWIPS text line
pub const MAX_LINE_LENGTH: usize = 4096;

pub fn read_exact<R: Read>(is: &mut R, buf: &mut [u8]) -> Result<(), DecodeError> {
    is.read_exact(buf).map_err(DecodeError::from_io)
}

/// Like `read_exact`, but distinguishes a clean EOF (zero bytes available)
/// from a short read. Returns `Ok(false)` at clean EOF.
pub fn try_read_exact<R: Read>(is: &mut R, buf: &mut [u8]) -> Result<bool, DecodeError> {
    let mut filled = 0;
    while filled < buf.len() {
        match is.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => return Err(DecodeError::Truncated),
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(DecodeError::from_io(e)),
        }
    }
    Ok(true)
}

pub fn read_u8<R: Read>(is: &mut R) -> Result<u8, DecodeError> {
    let mut buf = [0u8; 1];
    read_exact(is, &mut buf)?;
    Ok(buf[0])
}

pub fn read_u16<R: Read>(is: &mut R) -> Result<u16, DecodeError> {
    let mut buf = [0u8; 2];
    read_exact(is, &mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

pub fn read_i16<R: Read>(is: &mut R) -> Result<i16, DecodeError> {
    Ok(read_u16(is)? as i16)
}

pub fn read_u32<R: Read>(is: &mut R) -> Result<u32, DecodeError> {
    let mut buf = [0u8; 4];
    read_exact(is, &mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

pub fn read_f32<R: Read>(is: &mut R) -> Result<f32, DecodeError> {
    Ok(f32::from_bits(read_u32(is)?))
}

/// Normalize a slice of raw network-order values in place.
pub fn swap_from_be_u16(values: &mut [u16]) {
    for value in values.iter_mut() {
        *value = u16::from_be(*value);
    }
}

/// Normalize a fixed array of raw network-order pointers in place. Only the
/// first `count` elements are touched.
pub fn swap_from_be_u32(values: &mut [u32], count: usize) {
    for value in values.iter_mut().take(count) {
        *value = u32::from_be(*value);
    }
}

/// Read `count` network-order 16-bit values as one bulk transfer.
pub fn read_u16_vec<R: Read>(is: &mut R, count: usize) -> Result<Vec<u16>, DecodeError> {
    let mut raw = vec![0u8; count * 2];
    read_exact(is, &mut raw)?;

    let mut values: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
        .collect();
    swap_from_be_u16(&mut values);

    Ok(values)
}

/// Peek the next byte without consuming it. `None` at end of stream.
pub fn peek_byte<R: Read + Seek>(is: &mut R) -> Result<Option<u8>, DecodeError> {
    let mut buf = [0u8; 1];
    match is.read(&mut buf) {
        Ok(0) => Ok(None),
        Ok(_) => {
            is.seek(SeekFrom::Current(-1)).map_err(DecodeError::from_io)?;
            Ok(Some(buf[0]))
        }
        Err(e) => Err(DecodeError::from_io(e)),
    }
}

/// Read one line from an AWIPS text stream into `line`.
///
/// Consumes up to and including the terminating LF and strips any trailing
/// CRs, so a blank line (`\r\r\n`) yields an empty string. Stops without
/// consuming at an ETX byte. Returns `Ok(false)` when the stream is already
/// at EOF.
pub fn get_line<R: Read + Seek>(is: &mut R, line: &mut String) -> Result<bool, DecodeError> {
    line.clear();

    let mut raw: Vec<u8> = Vec::new();
    let mut any = false;

    loop {
        let mut buf = [0u8; 1];
        match is.read(&mut buf) {
            Ok(0) => break,
            Ok(_) => {
                any = true;
                match buf[0] {
                    b'\n' => break,
                    ETX => {
                        is.seek(SeekFrom::Current(-1)).map_err(DecodeError::from_io)?;
                        break;
                    }
                    b => {
                        if raw.len() >= MAX_LINE_LENGTH {
                            return Err(DecodeError::Malformed("text line too long".into()));
                        }
                        raw.push(b);
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(DecodeError::from_io(e)),
        }
    }

    while raw.last() == Some(&b'\r') {
        raw.pop();
    }

    *line = String::from_utf8(raw).map_err(|_| DecodeError::InvalidString)?;
    Ok(any)
}
