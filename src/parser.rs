//! Deserialize data from the bytecode protocol.
//!
//! All parsers run over [`NomBytes`] in nom's `complete` mode, so running out
//! of input surfaces as [`ErrorKind::Eof`]. [`decode`] maps nom failures onto
//! the crate taxonomy: `Eof` becomes [`Error::TruncatedBuffer`], anything else
//! [`Error::MalformedField`].
use bytes::Bytes;
use nom::{
    IResult, InputLength,
    bytes::complete::take,
    error::{ErrorKind, ParseError},
    multi::many_m_n,
    number::complete::{be_i8, be_i16, be_i32},
};
use nombytes::NomBytes;
use tracing::debug;

use crate::constants::{MAX_PROTOCOL_ARRAY_SIZE, MAX_STRING_SIZE, NULL_LENGTH};
use crate::error::{Error, Result};

/// Run `parser` over a complete payload.
pub fn decode<O, F>(payload: Bytes, mut parser: F) -> Result<O>
where
    F: FnMut(NomBytes) -> IResult<NomBytes, O>,
{
    match parser(NomBytes::new(payload)) {
        Ok((rest, out)) => {
            if rest.input_len() > 0 {
                debug!(trailing = rest.input_len(), "Ignoring trailing response bytes");
            }
            Ok(out)
        }
        Err(e) => Err(map_nom_error(e)),
    }
}

/// Translate a nom error into the crate error taxonomy.
pub fn map_nom_error(e: nom::Err<nom::error::Error<NomBytes>>) -> Error {
    match e {
        nom::Err::Incomplete(_) => Error::TruncatedBuffer,
        nom::Err::Error(e) | nom::Err::Failure(e) => match e.code {
            ErrorKind::Eof => Error::TruncatedBuffer,
            kind => Error::MalformedField(format!(
                "{:?} with {} bytes remaining",
                kind,
                e.input.input_len()
            )),
        },
    }
}

fn failure<E: ParseError<NomBytes>>(input: NomBytes, kind: ErrorKind) -> nom::Err<E> {
    nom::Err::Failure(E::from_error_kind(input, kind))
}

/// Convert bytes to a validated UTF-8 string.
/// Returns an error if the bytes are not valid UTF-8.
fn bytes_to_string(input: NomBytes, bytes: Bytes) -> IResult<NomBytes, String> {
    match String::from_utf8(bytes.to_vec()) {
        Ok(s) => Ok((input, s)),
        Err(_) => Err(failure(input, ErrorKind::Verify)),
    }
}

pub fn parse_bool(s: NomBytes) -> IResult<NomBytes, bool> {
    let (s, v) = be_i8(s)?;
    Ok((s, v != 0))
}

/// STRING: i16 length followed by UTF-8 bytes. Null is rejected.
pub fn parse_string(s: NomBytes) -> IResult<NomBytes, String> {
    let (s, value) = parse_nullable_string(s)?;
    match value {
        Some(value) => Ok((s, value)),
        None => Err(failure(s, ErrorKind::Verify)),
    }
}

/// NULLABLE_STRING: i16 length, `-1` for null.
pub fn parse_nullable_string(s: NomBytes) -> IResult<NomBytes, Option<String>> {
    let (s, length) = be_i16(s)?;

    if length == -1 {
        return Ok((s, None));
    }

    if length < 0 {
        return Err(failure(s, ErrorKind::LengthValue));
    }

    let (s, string) = take(length as usize)(s)?;
    let (s, string) = bytes_to_string(s, string.into_bytes())?;
    Ok((s, Some(string)))
}

/// BYTES: i32 length followed by raw bytes. Null is read as empty.
pub fn parse_bytes(s: NomBytes) -> IResult<NomBytes, Bytes> {
    let (s, value) = parse_nullable_bytes(s)?;
    Ok((s, value.unwrap_or_default()))
}

pub fn parse_nullable_bytes(s: NomBytes) -> IResult<NomBytes, Option<Bytes>> {
    let (s, length) = be_i32(s)?;

    if length == NULL_LENGTH {
        return Ok((s, None));
    }

    if length < 0 {
        return Err(failure(s, ErrorKind::LengthValue));
    }

    let (s, bytes) = take(length as usize)(s)?;
    Ok((s, Some(bytes.into_bytes())))
}

/// Validate a declared element count against the bytes actually left.
///
/// Every element occupies at least one byte, so a count larger than the
/// remaining input can only be a truncated or corrupt payload. Rejecting it
/// here keeps the count from sizing any allocation.
fn check_array_count<E: ParseError<NomBytes>>(
    input: &NomBytes,
    count: usize,
) -> std::result::Result<(), nom::Err<E>> {
    if count > MAX_PROTOCOL_ARRAY_SIZE as usize {
        return Err(failure(input.clone(), ErrorKind::TooLarge));
    }
    if count > input.input_len() {
        return Err(failure(input.clone(), ErrorKind::Eof));
    }
    Ok(())
}

/// ARRAY: i32 count followed by elements; `-1` (null) reads as empty.
pub fn parse_array<O, E, F>(f: F) -> impl FnMut(NomBytes) -> IResult<NomBytes, Vec<O>, E>
where
    F: nom::Parser<NomBytes, O, E> + Copy,
    E: ParseError<NomBytes>,
{
    move |input: NomBytes| {
        let (i, length) = be_i32(input)?;

        if length == NULL_LENGTH {
            return Ok((i, vec![]));
        }

        if length < 0 {
            return Err(failure(i, ErrorKind::LengthValue));
        }

        let count = length as usize;
        check_array_count(&i, count)?;
        many_m_n(count, count, f)(i)
    }
}

/// Parse an unsigned varint (variable-length integer) used in flexible encoding.
pub fn parse_unsigned_varint(s: NomBytes) -> IResult<NomBytes, u32> {
    let mut result: u32 = 0;
    let mut shift = 0;
    let mut remaining = s;

    loop {
        let (s, byte) = take(1usize)(remaining)?;
        let b = byte.into_bytes()[0];
        remaining = s;

        result |= ((b & 0x7F) as u32) << shift;

        if (b & 0x80) == 0 {
            break;
        }

        shift += 7;
        if shift > 28 {
            return Err(failure(remaining, ErrorKind::TooLarge));
        }
    }

    Ok((remaining, result))
}

/// COMPACT_STRING: varint (length + 1); null is rejected.
pub fn parse_compact_string(s: NomBytes) -> IResult<NomBytes, String> {
    let (s, value) = parse_compact_nullable_string(s)?;
    match value {
        Some(value) => Ok((s, value)),
        None => Err(failure(s, ErrorKind::Verify)),
    }
}

/// COMPACT_NULLABLE_STRING: varint length where 0 is null, 1 is empty and
/// n+1 is a string of length n. Lengths above [`MAX_STRING_SIZE`] are
/// rejected even when the bytes are present.
pub fn parse_compact_nullable_string(s: NomBytes) -> IResult<NomBytes, Option<String>> {
    let (s, length) = parse_unsigned_varint(s)?;

    if length == 0 {
        return Ok((s, None));
    }

    let length = (length - 1) as usize;
    if length > MAX_STRING_SIZE {
        return Err(failure(s, ErrorKind::TooLarge));
    }
    let (s, string) = take(length)(s)?;
    let (s, string) = bytes_to_string(s, string.into_bytes())?;
    Ok((s, Some(string)))
}

/// COMPACT_BYTES: varint (length + 1); null reads as empty.
pub fn parse_compact_bytes(s: NomBytes) -> IResult<NomBytes, Bytes> {
    let (s, length) = parse_unsigned_varint(s)?;

    if length == 0 {
        return Ok((s, Bytes::new()));
    }

    let (s, bytes) = take((length - 1) as usize)(s)?;
    Ok((s, bytes.into_bytes()))
}

/// COMPACT_ARRAY: varint (count + 1); null reads as empty.
pub fn parse_compact_array<O, E, F>(f: F) -> impl FnMut(NomBytes) -> IResult<NomBytes, Vec<O>, E>
where
    F: nom::Parser<NomBytes, O, E> + Copy,
    E: ParseError<NomBytes>,
{
    move |input: NomBytes| {
        let (i, length) = parse_unsigned_varint(input).map_err(|e| match e {
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                nom::Err::Failure(E::from_error_kind(e.input, e.code))
            }
            nom::Err::Incomplete(n) => nom::Err::Incomplete(n),
        })?;

        if length == 0 {
            return Ok((i, vec![]));
        }

        let count = (length - 1) as usize;
        check_array_count(&i, count)?;
        many_m_n(count, count, f)(i)
    }
}

/// Skip tagged fields in flexible encoding.
/// Format: unsigned varint count, then for each: varint tag, varint size, bytes
pub fn skip_tagged_fields(s: NomBytes) -> IResult<NomBytes, ()> {
    let (mut s, count) = parse_unsigned_varint(s)?;

    for _ in 0..count {
        let (remaining, _tag) = parse_unsigned_varint(s)?;
        let (remaining, size) = parse_unsigned_varint(remaining)?;
        let (remaining, _) = take(size as usize)(remaining)?;
        s = remaining;
    }

    Ok((s, ()))
}
