use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{error::HeaderError, Result};

/// Writes a `u32` length-prefixed byte field
pub(crate) fn write_blob<W: Write>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    writer.write_u32::<LittleEndian>(bytes.len() as u32)?;
    writer.write_all(bytes)
}

/// Writes a `u32` length-prefixed UTF-8 field
pub(crate) fn write_str<W: Write>(writer: &mut W, value: &str) -> io::Result<()> {
    write_blob(writer, value.as_bytes())
}

/// Reads a `u32` length-prefixed byte field
///
/// The read is bounded by the declared length so a corrupt prefix cannot
/// trigger an oversized allocation.
pub(crate) fn read_blob<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let len = reader.read_u32::<LittleEndian>()? as usize;
    let mut buf = Vec::new();
    reader.take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(HeaderError::FieldTooLong(len).into());
    }
    Ok(buf)
}

/// Reads a `u32` length-prefixed UTF-8 field
pub(crate) fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let bytes = read_blob(reader)?;
    Ok(String::from_utf8(bytes)?)
}

/// Returns the slice at `offset..offset + len` and moves the offset past it
pub(crate) fn slice_and_increment<'a>(offset: &mut usize, len: usize, bytes: &'a [u8]) -> &'a [u8] {
    let slice = &bytes[*offset..*offset + len];
    *offset += len;
    slice
}
