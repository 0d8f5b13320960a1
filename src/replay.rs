use crate::error::ReplayError;
use crate::moves::Move;
use crate::types::Color;

const MAGIC: &[u8; 4] = b"TLPA";
const VERSION: u32 = 1;
const HEADER_SIZE: usize = 20;

/// Encodes a committed move list into the history blob format:
/// `MAGIC | version | count | crc32(payload) | reserved`, then one
/// record per move: player code, origin id, destination id, dimension,
/// and the length-prefixed board snapshot. All integers little-endian.
pub fn encode_history(moves: &[Move]) -> Vec<u8> {
    let mut payload = Vec::new();
    for mv in moves {
        payload.push(mv.player.code());
        payload.extend_from_slice(&(mv.origin_id as u32).to_le_bytes());
        payload.extend_from_slice(&(mv.destin_id as u32).to_le_bytes());
        payload.extend_from_slice(&(mv.dimension as u32).to_le_bytes());
        let snapshot = mv.board_before.as_bytes();
        payload.extend_from_slice(&(snapshot.len() as u32).to_le_bytes());
        payload.extend_from_slice(snapshot);
    }

    let crc = crc32fast::hash(&payload);
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&(moves.len() as u32).to_le_bytes());
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&payload);
    out
}

/// Decodes a history blob back into move records, re-deriving each
/// move's coordinates and direction. The host replays these for the
/// game movie.
pub fn decode_history(data: &[u8]) -> Result<Vec<Move>, ReplayError> {
    if data.len() < HEADER_SIZE {
        return Err(ReplayError::TooShort {
            expected: HEADER_SIZE,
            got: data.len(),
        });
    }
    if &data[0..4] != MAGIC {
        return Err(ReplayError::BadMagic);
    }

    let version = read_u32_le(data, 4)?;
    if version != VERSION {
        return Err(ReplayError::UnsupportedVersion {
            expected: VERSION,
            got: version,
        });
    }

    let count = read_u32_le(data, 8)? as usize;
    let expected_crc = read_u32_le(data, 12)?;
    let payload = &data[HEADER_SIZE..];

    let actual_crc = crc32fast::hash(payload);
    if actual_crc != expected_crc {
        return Err(ReplayError::CrcMismatch {
            expected: expected_crc,
            actual: actual_crc,
        });
    }

    let mut offset = 0usize;
    let mut moves = Vec::with_capacity(count);
    for index in 0..count {
        let player_code = *payload
            .get(offset)
            .ok_or(ReplayError::UnexpectedEof("player code"))?;
        offset += 1;
        let player = Color::from_code(player_code).ok_or(ReplayError::InvalidRecord {
            index,
            message: format!("unknown player code {player_code}"),
        })?;

        let origin_id = read_u32_le(payload, offset)? as usize;
        let destin_id = read_u32_le(payload, offset + 4)? as usize;
        let dimension = read_u32_le(payload, offset + 8)? as usize;
        let snapshot_len = read_u32_le(payload, offset + 12)? as usize;
        offset += 16;

        if offset + snapshot_len > payload.len() {
            return Err(ReplayError::UnexpectedEof("board snapshot"));
        }
        let snapshot = std::str::from_utf8(&payload[offset..offset + snapshot_len])
            .map_err(|_| ReplayError::InvalidRecord {
                index,
                message: "board snapshot is not valid UTF-8".to_string(),
            })?
            .to_string();
        offset += snapshot_len;

        let mv = Move::from_ids(player, origin_id, destin_id, dimension, snapshot).map_err(
            |err| ReplayError::InvalidRecord {
                index,
                message: err.to_string(),
            },
        )?;
        moves.push(mv);
    }

    if offset != payload.len() {
        return Err(ReplayError::TrailingBytes);
    }

    Ok(moves)
}

fn read_u32_le(data: &[u8], offset: usize) -> Result<u32, ReplayError> {
    if offset + 4 > data.len() {
        return Err(ReplayError::UnexpectedEof("u32"));
    }
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    Ok(u32::from_le_bytes(bytes))
}
