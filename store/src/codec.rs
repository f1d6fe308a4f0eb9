use chrono::DateTime;

use crate::error::StoreError;
use crate::record::IdentityRecord;

const RECORD_MAGIC: [u8; 4] = [b'F', b'R', b'E', b'C'];
const RECORD_VERSION: u32 = 1;

/// Encodes a record as one backend row.
///
/// ```text
/// [4B magic "FREC"] [4B version=1]
/// [8B id] [8B created_at unix ms (i64)] [4B source_count]
/// [4B nameLen] [nameLen bytes UTF-8 name]
/// [4B dim] [dim x 4B float32 embedding]
/// ```
///
/// All multi-byte values are little-endian.
pub fn encode_record(rec: &IdentityRecord) -> Vec<u8> {
    let name = rec.name.as_bytes();
    let mut buf = Vec::with_capacity(36 + name.len() + rec.embedding.len() * 4);

    buf.extend_from_slice(&RECORD_MAGIC);
    buf.extend_from_slice(&RECORD_VERSION.to_le_bytes());
    buf.extend_from_slice(&rec.id.to_le_bytes());
    buf.extend_from_slice(&rec.created_at.timestamp_millis().to_le_bytes());
    buf.extend_from_slice(&rec.source_count.to_le_bytes());
    buf.extend_from_slice(&(name.len() as u32).to_le_bytes());
    buf.extend_from_slice(name);
    buf.extend_from_slice(&(rec.embedding.len() as u32).to_le_bytes());
    for v in &rec.embedding {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf
}

/// Decodes a row written by [`encode_record`]. Any structural problem is
/// reported as [`StoreError::Corrupt`].
pub fn decode_record(data: &[u8]) -> Result<IdentityRecord, StoreError> {
    let mut r = Reader { data, pos: 0 };

    let magic = r.take(4)?;
    if magic != RECORD_MAGIC {
        return Err(corrupt(format!("invalid magic {magic:?}")));
    }
    let version = r.u32()?;
    if version != RECORD_VERSION {
        return Err(corrupt(format!("unsupported record version {version}")));
    }

    let id = r.u64()?;
    let created_ms = r.i64()?;
    let source_count = r.u32()?;

    let name_len = r.u32()? as usize;
    let name = std::str::from_utf8(r.take(name_len)?)
        .map_err(|e| corrupt(format!("name is not utf-8: {e}")))?
        .to_string();

    let dim = r.u32()? as usize;
    let raw = r.take(dim.checked_mul(4).ok_or_else(|| corrupt("dimension overflow"))?)?;
    let embedding = raw
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    if r.pos != data.len() {
        return Err(corrupt(format!(
            "{} trailing bytes after record {id}",
            data.len() - r.pos
        )));
    }

    let created_at = DateTime::from_timestamp_millis(created_ms)
        .ok_or_else(|| corrupt(format!("timestamp {created_ms} out of range")))?;

    Ok(IdentityRecord {
        id,
        name,
        embedding,
        created_at,
        source_count,
    })
}

/// Decodes a little-endian u64 metadata value.
pub fn decode_u64(data: &[u8]) -> Result<u64, StoreError> {
    let b: [u8; 8] = data
        .try_into()
        .map_err(|_| corrupt(format!("expected 8 bytes, got {}", data.len())))?;
    Ok(u64::from_le_bytes(b))
}

/// Decodes a little-endian u32 metadata value.
pub fn decode_u32(data: &[u8]) -> Result<u32, StoreError> {
    let b: [u8; 4] = data
        .try_into()
        .map_err(|_| corrupt(format!("expected 4 bytes, got {}", data.len())))?;
    Ok(u32::from_le_bytes(b))
}

fn corrupt(msg: impl Into<String>) -> StoreError {
    StoreError::Corrupt(msg.into())
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], StoreError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| corrupt(format!("truncated record at byte {}", self.pos)))?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32, StoreError> {
        decode_u32(self.take(4)?)
    }

    fn u64(&mut self) -> Result<u64, StoreError> {
        decode_u64(self.take(8)?)
    }

    fn i64(&mut self) -> Result<i64, StoreError> {
        Ok(self.u64()? as i64)
    }
}
