//! Bounds-checked binary parsing for U2F token responses
//!
//! The registration payload embeds a self-delimiting ASN.1/DER attestation
//! certificate between the key handle and the trailing signature. This module
//! provides a cursor over the raw bytes plus the minimal DER traversal needed
//! to delimit that certificate and pull the EC public key out of its
//! `SubjectPublicKeyInfo`. Rejection of malformed input is total: every read
//! is bounds-checked and nothing panics.

use crate::errors::U2fError;

/// ASN.1 constructed SEQUENCE tag
const TAG_SEQUENCE: u8 = 0x30;
/// ASN.1 INTEGER tag
const TAG_INTEGER: u8 = 0x02;
/// ASN.1 BIT STRING tag
const TAG_BIT_STRING: u8 = 0x03;
/// Context-specific [0] tag wrapping the X.509 version field
const TAG_VERSION: u8 = 0xa0;

/// Uncompressed SEC1 point marker
pub const UNCOMPRESSED_POINT: u8 = 0x04;

/// Length of an uncompressed P-256 point (0x04 + x + y)
pub const EC_POINT_LENGTH: usize = 65;

/// Forward-only reader over a byte slice
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of unread bytes
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Read a single byte
    ///
    /// # Errors
    /// Returns `MalformedResponse` if the buffer is exhausted.
    pub fn read_u8(&mut self) -> Result<u8, U2fError> {
        let bytes = self.read_bytes(1)?;
        Ok(bytes[0])
    }

    /// Read a big-endian unsigned 32-bit value
    ///
    /// # Errors
    /// Returns `MalformedResponse` if fewer than 4 bytes remain.
    pub fn read_u32_be(&mut self) -> Result<u32, U2fError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read exactly `len` bytes
    ///
    /// # Errors
    /// Returns `MalformedResponse` if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], U2fError> {
        if self.remaining() < len {
            return Err(U2fError::MalformedResponse(format!(
                "unexpected end of input: wanted {len} bytes, {} remain",
                self.remaining()
            )));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Consume and return everything left in the buffer
    pub fn read_rest(&mut self) -> &'a [u8] {
        let bytes = &self.buf[self.pos..];
        self.pos = self.buf.len();
        bytes
    }
}

/// Read a DER tag-length header and return `(tag, content_length)`
///
/// Handles the definite short form and the definite long form up to four
/// length octets. Indefinite lengths are not valid DER and are rejected.
fn read_tlv_header(cursor: &mut ByteCursor<'_>) -> Result<(u8, usize), U2fError> {
    let tag = cursor.read_u8()?;
    let first = cursor.read_u8()?;
    if first < 0x80 {
        return Ok((tag, usize::from(first)));
    }
    let num_octets = usize::from(first & 0x7f);
    if num_octets == 0 || num_octets > 4 {
        return Err(U2fError::MalformedResponse(format!(
            "unsupported DER length form: 0x{first:02x}"
        )));
    }
    let mut len: usize = 0;
    for &octet in cursor.read_bytes(num_octets)? {
        len = (len << 8) | usize::from(octet);
    }
    Ok((tag, len))
}

/// Read a complete DER element, returning `(tag, content)`
fn read_tlv<'a>(cursor: &mut ByteCursor<'a>) -> Result<(u8, &'a [u8]), U2fError> {
    let (tag, len) = read_tlv_header(cursor)?;
    let content = cursor.read_bytes(len)?;
    Ok((tag, content))
}

/// Expect a DER element with the given tag and return its content
fn expect_tlv<'a>(cursor: &mut ByteCursor<'a>, expected: u8) -> Result<&'a [u8], U2fError> {
    let (tag, content) = read_tlv(cursor)?;
    if tag != expected {
        return Err(U2fError::MalformedResponse(format!(
            "unexpected DER tag 0x{tag:02x}, wanted 0x{expected:02x}"
        )));
    }
    Ok(content)
}

/// Total encoded length (header plus content) of the DER element starting at
/// the front of `bytes`
///
/// Used to delimit the self-delimiting attestation certificate inside the
/// registration payload.
///
/// # Errors
/// Returns `MalformedResponse` if the element is not a SEQUENCE or its
/// declared length exceeds the buffer.
pub fn element_length(bytes: &[u8]) -> Result<usize, U2fError> {
    let mut cursor = ByteCursor::new(bytes);
    let (tag, len) = read_tlv_header(&mut cursor)?;
    if tag != TAG_SEQUENCE {
        return Err(U2fError::MalformedResponse(format!(
            "attestation certificate does not start with a SEQUENCE (tag 0x{tag:02x})"
        )));
    }
    let header_len = bytes.len() - cursor.remaining();
    let total = header_len
        .checked_add(len)
        .filter(|&total| total <= bytes.len())
        .ok_or_else(|| {
            U2fError::MalformedResponse("attestation certificate length overruns buffer".into())
        })?;
    Ok(total)
}

/// Extract the uncompressed EC point from an X.509 certificate's
/// `SubjectPublicKeyInfo`
///
/// Walks `Certificate -> tbsCertificate -> subjectPublicKeyInfo` by skipping
/// the preceding TBS fields, then unwraps the BIT STRING holding the SEC1
/// point. Certificate signature and chain are not evaluated here; callers
/// that need attestation trust keep the raw certificate bytes.
///
/// # Errors
/// Returns `MalformedResponse` if the certificate structure does not parse
/// or the embedded key is not a 65-byte uncompressed point.
pub fn certificate_public_key(certificate: &[u8]) -> Result<[u8; EC_POINT_LENGTH], U2fError> {
    let mut cursor = ByteCursor::new(certificate);
    let tbs_and_rest = expect_tlv(&mut cursor, TAG_SEQUENCE)?;

    let mut tbs = ByteCursor::new(tbs_and_rest);
    let mut tbs_fields = ByteCursor::new(expect_tlv(&mut tbs, TAG_SEQUENCE)?);

    // version is EXPLICIT [0] and optional; v1 certificates omit it
    let (first_tag, _) = read_tlv(&mut tbs_fields)?;
    if first_tag == TAG_VERSION {
        // first field was the version wrapper, serialNumber comes next
        expect_tlv(&mut tbs_fields, TAG_INTEGER)?;
    } else if first_tag != TAG_INTEGER {
        return Err(U2fError::MalformedResponse(format!(
            "unexpected leading TBS field (tag 0x{first_tag:02x})"
        )));
    }

    // signature, issuer, validity, subject
    for _ in 0..4 {
        expect_tlv(&mut tbs_fields, TAG_SEQUENCE)?;
    }

    let mut spki = ByteCursor::new(expect_tlv(&mut tbs_fields, TAG_SEQUENCE)?);
    expect_tlv(&mut spki, TAG_SEQUENCE)?; // AlgorithmIdentifier
    let bit_string = expect_tlv(&mut spki, TAG_BIT_STRING)?;

    // first BIT STRING octet is the unused-bits count, zero for whole bytes
    if bit_string.len() != 1 + EC_POINT_LENGTH || bit_string[0] != 0 {
        return Err(U2fError::MalformedResponse(
            "subject public key is not a 65-byte uncompressed point".into(),
        ));
    }
    let point = &bit_string[1..];
    if point[0] != UNCOMPRESSED_POINT {
        return Err(U2fError::MalformedResponse(
            "subject public key is not in uncompressed point format".into(),
        ));
    }

    let mut key = [0u8; EC_POINT_LENGTH];
    key.copy_from_slice(point);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_rejects_overread() {
        let mut cursor = ByteCursor::new(&[0x01, 0x02]);
        assert!(cursor.read_bytes(3).is_err());
        // failed read consumes nothing
        assert_eq!(cursor.remaining(), 2);
        assert_eq!(cursor.read_u8().unwrap(), 0x01);
    }

    #[test]
    fn cursor_reads_big_endian_counter() {
        let mut cursor = ByteCursor::new(&[0x00, 0x00, 0x01, 0x02]);
        assert_eq!(cursor.read_u32_be().unwrap(), 258);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn element_length_short_form() {
        // SEQUENCE of 3 content bytes followed by 2 trailing bytes
        let bytes = [0x30, 0x03, 0xaa, 0xbb, 0xcc, 0xdd, 0xee];
        assert_eq!(element_length(&bytes).unwrap(), 5);
    }

    #[test]
    fn element_length_long_form() {
        let mut bytes = vec![0x30, 0x82, 0x01, 0x00];
        bytes.extend(std::iter::repeat(0u8).take(256));
        assert_eq!(element_length(&bytes).unwrap(), 260);
    }

    #[test]
    fn element_length_rejects_truncated_content() {
        // declares 0x10 content bytes but only 2 follow
        let bytes = [0x30, 0x10, 0x01, 0x02];
        assert!(element_length(&bytes).is_err());
    }

    #[test]
    fn element_length_rejects_non_sequence() {
        assert!(element_length(&[0x04, 0x01, 0x00]).is_err());
    }

    #[test]
    fn element_length_rejects_indefinite_length() {
        assert!(element_length(&[0x30, 0x80, 0x00, 0x00]).is_err());
    }

    #[test]
    fn certificate_public_key_rejects_garbage() {
        assert!(certificate_public_key(&[]).is_err());
        assert!(certificate_public_key(&[0x30, 0x02, 0x00, 0x00]).is_err());
        let not_der = vec![0xff; 128];
        assert!(certificate_public_key(&not_der).is_err());
    }
}
