/*!
Descends the IFF-style `FORM`/`CAT ` container hierarchy used by XMI files to find the byte
range of the first `EVNT` (event stream) chunk.
!*/

use crate::byte_cursor::ByteCursor;
use crate::error::{self, LibResult};
use log::{debug, trace, warn};
use snafu::ResultExt;

/// Some XMI files store the outer `FORM`/`XMID` header as the literal bytes `"XMID"` followed by
/// the big-endian integer that spells "FORM" in ASCII, rather than a real size. When this is
/// seen, the chunk is reinterpreted as a `FORM` chunk and the following four bytes are the real
/// size.
const FORM_AS_INT: u32 = 0x464F_524D;

/// Locates the first `EVNT` chunk in `data`, returning its `(start, end)` byte range (exclusive
/// end), not including the 8-byte chunk header.
pub(crate) fn locate_evnt(data: &[u8]) -> LibResult<(usize, usize)> {
    if data.len() < 8 {
        return error::TruncatedContainer {
            site: site!(),
            description: "file is too short to contain a chunk header",
        }
        .fail();
    }
    let mut cursor = ByteCursor::new(data);
    match descend(&mut cursor, data.len(), data.len())? {
        Some(range) => {
            debug!("located EVNT at {:?}", range);
            Ok(range)
        }
        None => error::NoEvntChunk { site: site!() }.fail(),
    }
}

/// Reads a 4-byte tag and 4-byte big-endian size, applying the `FORM_AS_INT` quirk.
fn read_chunk_header(cursor: &mut ByteCursor) -> LibResult<(String, u32)> {
    let id_bytes = cursor.read_n(4).context(io!())?;
    let id = String::from_utf8_lossy(id_bytes).into_owned();
    let size = cursor.read_u32_be().context(io!())?;
    if id == "XMID" && size == FORM_AS_INT {
        trace!("FORM_AS_INT quirk detected, reinterpreting as FORM");
        let real_size = cursor.read_u32_be().context(io!())?;
        return Ok(("FORM".to_string(), real_size));
    }
    Ok((id, size))
}

/// Walks sibling chunks in `[cursor.position(), end)`, descending into containers, until an
/// `EVNT` is found or the range is exhausted. `data_len` is the full buffer length, needed by
/// catalog offset lists which seek to absolute positions outside `end`.
fn descend(
    cursor: &mut ByteCursor,
    end: usize,
    data_len: usize,
) -> LibResult<Option<(usize, usize)>> {
    loop {
        if cursor.position() + 8 > end {
            return Ok(None);
        }
        let chunk_start = cursor.position();
        let (id, size) = match read_chunk_header(cursor) {
            Ok(v) => v,
            Err(e) => {
                warn!("unable to read chunk header at {}: {}", chunk_start, e);
                return Ok(None);
            }
        };
        let payload_start = cursor.position();
        let payload_end = match payload_start.checked_add(size as usize) {
            Some(v) if v <= end => v,
            _ => {
                warn!(
                    "chunk '{}' at {} claims size {} past end of range",
                    id, chunk_start, size
                );
                return Ok(None);
            }
        };

        match id.as_str() {
            "EVNT" => return Ok(Some((payload_start, payload_end))),
            "FORM" => {
                if payload_end >= payload_start + 4 {
                    cursor.read_n(4).context(io!())?;
                    match descend(cursor, payload_end, data_len) {
                        Ok(Some(range)) => return Ok(Some(range)),
                        Ok(None) => {}
                        Err(e) => warn!("error descending into FORM at {}: {}", chunk_start, e),
                    }
                }
            }
            "CAT " => {
                if payload_end >= payload_start + 4 {
                    cursor.read_n(4).context(io!())?;
                    match catalog_mode(cursor, payload_end, data_len) {
                        Ok(Some(range)) => return Ok(Some(range)),
                        Ok(None) => {}
                        Err(e) => warn!("error in catalog at {}: {}", chunk_start, e),
                    }
                }
            }
            _ => trace!("skipping chunk '{}' ({} bytes)", id, size),
        }

        cursor.seek(payload_end).context(io!())?;
        if size % 2 == 1 && cursor.position() < end {
            let _ = cursor.read().context(io!())?;
        }
    }
}

/// Handles a `CAT ` chunk body: either a single nested form, or a little-endian offset list
/// pointing at sub-songs scattered elsewhere in the file.
fn catalog_mode(
    cursor: &mut ByteCursor,
    end: usize,
    data_len: usize,
) -> LibResult<Option<(usize, usize)>> {
    if let Some(tag) = cursor.peek_n(4) {
        if tag == b"FORM" || tag == b"XMID" || tag == b"MROF" {
            return descend(cursor, end, data_len);
        }
    }

    let count = cursor.read_u16_le().context(io!())?;
    let _reserved = cursor.read_n(2).context(io!())?;
    debug!("catalog offset list with {} entries", count);

    for _ in 0..count {
        if cursor.position() + 4 > end {
            break;
        }
        let offset = cursor.read_u32_le().context(io!())?;
        if offset == 0 {
            continue;
        }
        let offset = offset as usize;
        let resume = cursor.position();
        if offset >= data_len {
            warn!("catalog entry offset {} is out of bounds", offset);
            continue;
        }
        cursor.seek(offset).context(io!())?;
        match descend_catalog_entry(cursor, data_len) {
            Ok(Some(range)) => return Ok(Some(range)),
            Ok(None) => {}
            Err(e) => warn!("error in catalog entry at offset {}: {}", offset, e),
        }
        cursor.seek(resume).context(io!())?;
    }
    Ok(None)
}

/// Parses a single catalog offset-list entry: expects a `FORM`/`XMID` header at the cursor's
/// current (seeked-to) position, then descends within its bounds.
fn descend_catalog_entry(
    cursor: &mut ByteCursor,
    data_len: usize,
) -> LibResult<Option<(usize, usize)>> {
    let header_start = cursor.position();
    let (id, size) = match read_chunk_header(cursor) {
        Ok(v) => v,
        Err(e) => {
            warn!("catalog entry at {} has unreadable header: {}", header_start, e);
            return Ok(None);
        }
    };
    if id != "FORM" {
        warn!(
            "catalog entry at {} expected a FORM/XMID header, found '{}'",
            header_start, id
        );
        return Ok(None);
    }
    let payload_start = cursor.position();
    let payload_end = match payload_start.checked_add(size as usize) {
        Some(v) if v <= data_len => v,
        _ => {
            warn!("catalog entry FORM at {} runs past end of file", header_start);
            return Ok(None);
        }
    };
    if payload_end < payload_start + 4 {
        return Ok(None);
    }
    cursor.read_n(4).context(io!())?;
    descend(cursor, payload_end, data_len)
}
