//! AMS/TCP framing.
//!
//! Every frame is a 6-byte AMS/TCP prefix followed by a 32-byte AMS header
//! and the command payload. All integers are little-endian.
//!
//! AMS/TCP prefix:
//! - Bytes 0-1: Reserved, zero
//! - Bytes 2-5: Length of AMS header plus payload
//!
//! AMS header:
//! - Bytes 0-5: Target net id
//! - Bytes 6-7: Target port
//! - Bytes 8-13: Source net id
//! - Bytes 14-15: Source port
//! - Bytes 16-17: Command id
//! - Bytes 18-19: State flags
//! - Bytes 20-23: Payload length
//! - Bytes 24-27: Error code
//! - Bytes 28-31: Invoke id

use crate::error::{AdsError, AdsResult};
use crate::net_id::AmsNetId;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// AMS/TCP prefix size in bytes.
pub const TCP_HEADER_SIZE: usize = 6;

/// AMS header size in bytes.
pub const AMS_HEADER_SIZE: usize = 32;

/// Largest frame body this client accepts.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// State flags of a request sent over TCP.
pub const STATE_REQUEST: u16 = 0x0004;

/// Response bit of the state flags.
pub const STATE_RESPONSE: u16 = 0x0001;

/// Index group: acquire a handle for a symbol name.
pub const IG_SYM_HNDBYNAME: u32 = 0xF003;

/// Index group: read or write a value by handle.
pub const IG_SYM_VALBYHND: u32 = 0xF005;

/// Index group: release a handle.
pub const IG_SYM_RELEASEHND: u32 = 0xF006;

/// ADS commands used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Command {
    /// Read data.
    Read = 2,
    /// Write data.
    Write = 3,
    /// Write data, then read data, in one request.
    ReadWrite = 9,
}

impl Command {
    /// Parses a command id.
    pub fn from_u16(id: u16) -> Option<Self> {
        match id {
            2 => Some(Command::Read),
            3 => Some(Command::Write),
            9 => Some(Command::ReadWrite),
            _ => None,
        }
    }
}

/// AMS header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmsHeader {
    /// Target net id.
    pub target_net_id: AmsNetId,
    /// Target AMS port.
    pub target_port: u16,
    /// Source net id.
    pub source_net_id: AmsNetId,
    /// Source AMS port.
    pub source_port: u16,
    /// Command id.
    pub command: u16,
    /// State flags.
    pub state_flags: u16,
    /// Payload length.
    pub data_length: u32,
    /// AMS error code.
    pub error_code: u32,
    /// Request id echoed by the response.
    pub invoke_id: u32,
}

impl AmsHeader {
    /// Returns true if the frame is a response.
    pub fn is_response(&self) -> bool {
        self.state_flags & STATE_RESPONSE != 0
    }

    /// Parses a header from the start of `buf`.
    pub fn parse(mut buf: &[u8]) -> AdsResult<Self> {
        if buf.len() < AMS_HEADER_SIZE {
            return Err(AdsError::protocol(format!(
                "AMS header needs {AMS_HEADER_SIZE} bytes, got {}",
                buf.len()
            )));
        }

        let target_net_id = get_net_id(&mut buf);
        let target_port = buf.get_u16_le();
        let source_net_id = get_net_id(&mut buf);
        let source_port = buf.get_u16_le();

        Ok(AmsHeader {
            target_net_id,
            target_port,
            source_net_id,
            source_port,
            command: buf.get_u16_le(),
            state_flags: buf.get_u16_le(),
            data_length: buf.get_u32_le(),
            error_code: buf.get_u32_le(),
            invoke_id: buf.get_u32_le(),
        })
    }

    /// Appends the header to `buf`.
    pub fn write(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.target_net_id.bytes());
        buf.put_u16_le(self.target_port);
        buf.put_slice(&self.source_net_id.bytes());
        buf.put_u16_le(self.source_port);
        buf.put_u16_le(self.command);
        buf.put_u16_le(self.state_flags);
        buf.put_u32_le(self.data_length);
        buf.put_u32_le(self.error_code);
        buf.put_u32_le(self.invoke_id);
    }
}

fn get_net_id(buf: &mut &[u8]) -> AmsNetId {
    let mut bytes = [0u8; 6];
    buf.copy_to_slice(&mut bytes);
    AmsNetId::from_bytes(bytes)
}

/// Builds a complete frame: AMS/TCP prefix, `header` and `payload`.
///
/// The header's `data_length` is set from the payload.
pub fn encode_frame(header: &AmsHeader, payload: &[u8]) -> AdsResult<Bytes> {
    let data_length = u32::try_from(payload.len())
        .map_err(|_| AdsError::protocol("payload too large"))?;
    let header = AmsHeader {
        data_length,
        ..header.clone()
    };

    let mut buf = BytesMut::with_capacity(TCP_HEADER_SIZE + AMS_HEADER_SIZE + payload.len());
    buf.put_u16_le(0);
    buf.put_u32_le(data_length + AMS_HEADER_SIZE as u32);
    header.write(&mut buf);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Parses the AMS/TCP prefix, returning the body length that follows.
pub fn parse_tcp_header(prefix: [u8; TCP_HEADER_SIZE]) -> AdsResult<usize> {
    let mut buf = &prefix[..];
    let reserved = buf.get_u16_le();
    if reserved != 0 {
        return Err(AdsError::protocol(format!(
            "unexpected AMS/TCP reserved field {reserved:#06x}"
        )));
    }
    let length = buf.get_u32_le() as usize;
    if !(AMS_HEADER_SIZE..=MAX_FRAME_SIZE).contains(&length) {
        return Err(AdsError::protocol(format!("invalid frame length {length}")));
    }
    Ok(length)
}

/// Splits a frame body into header and payload.
pub fn split_body(body: &[u8]) -> AdsResult<(AmsHeader, &[u8])> {
    let header = AmsHeader::parse(body)?;
    let length = header.data_length as usize;
    let payload = &body[AMS_HEADER_SIZE..];
    if payload.len() < length {
        return Err(AdsError::protocol(format!(
            "payload announces {length} bytes, got {}",
            payload.len()
        )));
    }
    Ok((header, &payload[..length]))
}

/// Payload of a Read request.
pub fn read_request(index_group: u32, index_offset: u32, length: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(12);
    buf.put_u32_le(index_group);
    buf.put_u32_le(index_offset);
    buf.put_u32_le(length);
    buf.freeze()
}

/// Payload of a Write request.
pub fn write_request(index_group: u32, index_offset: u32, data: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(12 + data.len());
    buf.put_u32_le(index_group);
    buf.put_u32_le(index_offset);
    buf.put_u32_le(data.len() as u32);
    buf.put_slice(data);
    buf.freeze()
}

/// Payload of a ReadWrite request.
pub fn read_write_request(index_group: u32, index_offset: u32, read_length: u32, data: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(16 + data.len());
    buf.put_u32_le(index_group);
    buf.put_u32_le(index_offset);
    buf.put_u32_le(read_length);
    buf.put_u32_le(data.len() as u32);
    buf.put_slice(data);
    buf.freeze()
}

/// Parses the payload of a Read or ReadWrite response.
pub fn parse_read_response(mut payload: &[u8]) -> AdsResult<Bytes> {
    if payload.len() < 8 {
        return Err(AdsError::protocol("read response shorter than 8 bytes"));
    }
    let result = payload.get_u32_le();
    if result != 0 {
        return Err(AdsError::status(result));
    }
    let length = payload.get_u32_le() as usize;
    if payload.len() < length {
        return Err(AdsError::protocol(format!(
            "read response announces {length} bytes, got {}",
            payload.len()
        )));
    }
    Ok(Bytes::copy_from_slice(&payload[..length]))
}

/// Parses the payload of a Write response.
pub fn parse_write_response(mut payload: &[u8]) -> AdsResult<()> {
    if payload.len() < 4 {
        return Err(AdsError::protocol("write response shorter than 4 bytes"));
    }
    match payload.get_u32_le() {
        0 => Ok(()),
        code => Err(AdsError::status(code)),
    }
}
