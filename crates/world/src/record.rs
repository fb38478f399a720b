//! Binary world record format.
//!
//! A record is a fixed 14-byte header followed by a zstd-compressed bincode
//! payload holding one [`WorldProperties`]. The header carries a CRC32 of the
//! compressed payload so truncated or damaged records are rejected instead of
//! being half-read.

use crc32fast::Hasher;

use crate::WorldProperties;

/// File name of the properties record inside a world folder.
pub const RECORD_FILE_NAME: &str = "level.wh";

/// Magic number for record identification ("WHLV").
const RECORD_MAGIC: u32 = 0x5748_4C56;

/// Current record format version.
const RECORD_VERSION: u16 = 1;

const HEADER_LEN: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq)]
struct RecordHeader {
    magic: u32,
    version: u16,
    crc32: u32,
    payload_len: u32,
}

impl RecordHeader {
    fn new(crc32: u32, payload_len: u32) -> Self {
        Self {
            magic: RECORD_MAGIC,
            version: RECORD_VERSION,
            crc32,
            payload_len,
        }
    }

    fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes[6..10].copy_from_slice(&self.crc32.to_le_bytes());
        bytes[10..14].copy_from_slice(&self.payload_len.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() < HEADER_LEN {
            return Err("record header too short".to_string());
        }
        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != RECORD_MAGIC {
            return Err(format!(
                "invalid record magic: expected 0x{RECORD_MAGIC:08X}, got 0x{magic:08X}"
            ));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != RECORD_VERSION {
            return Err(format!("unsupported record version {version}"));
        }
        Ok(Self {
            magic,
            version,
            crc32: u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]),
            payload_len: u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]),
        })
    }
}

fn checksum(payload: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(payload);
    hasher.finalize()
}

/// Encode properties into record bytes.
pub fn encode_record(properties: &WorldProperties) -> Result<Vec<u8>, String> {
    let serialized = bincode::serialize(properties).map_err(|err| err.to_string())?;
    let compressed = zstd::encode_all(&serialized[..], 3).map_err(|err| err.to_string())?;
    let payload_len = u32::try_from(compressed.len()).map_err(|_| "record too large".to_string())?;

    let header = RecordHeader::new(checksum(&compressed), payload_len);
    let mut bytes = Vec::with_capacity(HEADER_LEN + compressed.len());
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(&compressed);
    Ok(bytes)
}

/// Decode record bytes, validating header and checksum.
pub fn decode_record(bytes: &[u8]) -> Result<WorldProperties, String> {
    let header = RecordHeader::from_bytes(bytes)?;
    let payload = &bytes[HEADER_LEN..];
    if payload.len() != header.payload_len as usize {
        return Err(format!(
            "record payload length mismatch: header says {}, found {}",
            header.payload_len,
            payload.len()
        ));
    }
    let computed = checksum(payload);
    if computed != header.crc32 {
        return Err(format!(
            "CRC32 mismatch: expected {:08X}, got {computed:08X}",
            header.crc32
        ));
    }
    let decompressed = zstd::decode_all(payload).map_err(|err| err.to_string())?;
    bincode::deserialize(&decompressed).map_err(|err| err.to_string())
}
