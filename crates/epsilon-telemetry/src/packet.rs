//! E1.31 (streaming ACN) data packet envelope.
//!
//! Only the fields the bridge needs are validated: the root, framing and
//! DMP vectors, the ACN identifier, the universe, and the DMX start code.
//! Everything is read through bounds-checked slices so truncated
//! datagrams are rejected rather than panicking.

/// UDP port reserved for E1.31.
pub const E131_PORT: u16 = 5568;

/// Smallest well-formed data packet (headers plus start code, no slots).
pub const MIN_PACKET_LEN: usize = 126;

/// Largest DMX payload.
pub const MAX_SLOTS: usize = 512;

const PREAMBLE_SIZE: u16 = 0x0010;
const ACN_PACKET_IDENTIFIER: &[u8; 12] = b"ASC-E1.17\0\0\0";
const VECTOR_ROOT_E131_DATA: u32 = 0x0000_0004;
const VECTOR_E131_DATA_PACKET: u32 = 0x0000_0002;
const VECTOR_DMP_SET_PROPERTY: u8 = 0x02;
const DMP_ADDRESS_TYPE: u8 = 0xa1;
const DMX_START_CODE: u8 = 0x00;
const FLAGS: u16 = 0x7000;

const OFFSET_PREAMBLE: usize = 0;
const OFFSET_IDENTIFIER: usize = 4;
const OFFSET_ROOT_LENGTH: usize = 16;
const OFFSET_ROOT_VECTOR: usize = 18;
const OFFSET_CID: usize = 22;
const OFFSET_FRAMING_LENGTH: usize = 38;
const OFFSET_FRAMING_VECTOR: usize = 40;
const OFFSET_SOURCE_NAME: usize = 44;
const OFFSET_PRIORITY: usize = 108;
const OFFSET_SEQUENCE: usize = 111;
const OFFSET_OPTIONS: usize = 112;
const OFFSET_UNIVERSE: usize = 113;
const OFFSET_DMP_LENGTH: usize = 115;
const OFFSET_DMP_VECTOR: usize = 117;
const OFFSET_ADDRESS_TYPE: usize = 118;
const OFFSET_ADDRESS_INCREMENT: usize = 121;
const OFFSET_PROPERTY_COUNT: usize = 123;
const OFFSET_START_CODE: usize = 125;
const OFFSET_SLOTS: usize = 126;

/// Options bit: the source has stopped transmitting this universe.
const OPTION_STREAM_TERMINATED: u8 = 0x40;

/// Why a datagram was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketRejection {
    /// Shorter than the fixed headers.
    TooShort(usize),
    /// Preamble size or ACN identifier mismatch.
    NotAcn,
    /// Root vector is not E1.31 data (e.g. a sync or discovery packet).
    RootVector(u32),
    /// Framing vector is not a data packet.
    FramingVector(u32),
    /// DMP layer is not a set-property message.
    DmpVector(u8),
    /// Non-zero DMX start code (alternate start code payloads).
    StartCode(u8),
}

impl core::fmt::Display for PacketRejection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TooShort(len) => write!(f, "packet too short ({len} bytes)"),
            Self::NotAcn => f.write_str("not an ACN packet"),
            Self::RootVector(v) => write!(f, "unexpected root vector {v:#x}"),
            Self::FramingVector(v) => write!(f, "unexpected framing vector {v:#x}"),
            Self::DmpVector(v) => write!(f, "unexpected DMP vector {v:#x}"),
            Self::StartCode(code) => write!(f, "non-zero start code {code:#x}"),
        }
    }
}

/// A validated DMX data frame borrowed from a datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmxFrame<'a> {
    /// Logical universe of the frame.
    pub universe: u16,
    /// Source sequence number.
    pub sequence: u8,
    /// Whether the source flagged the stream as terminated.
    pub stream_terminated: bool,
    /// DMX slot values, slot 1 first.
    pub slots: &'a [u8],
}

fn read_u8(buf: &[u8], offset: usize) -> Option<u8> {
    buf.get(offset).copied()
}

fn read_u16(buf: &[u8], offset: usize) -> Option<u16> {
    let bytes = buf.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_be_bytes(bytes.try_into().ok()?))
}

fn read_u32(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_be_bytes(bytes.try_into().ok()?))
}

/// Validate an E1.31 data packet and borrow its DMX payload.
///
/// # Errors
///
/// Returns the [`PacketRejection`] describing the first envelope check
/// that failed.
pub fn parse_data_packet(buf: &[u8]) -> Result<DmxFrame<'_>, PacketRejection> {
    let too_short = PacketRejection::TooShort(buf.len());
    if buf.len() < MIN_PACKET_LEN {
        return Err(too_short);
    }

    let identifier = buf.get(OFFSET_IDENTIFIER..OFFSET_ROOT_LENGTH);
    if read_u16(buf, OFFSET_PREAMBLE) != Some(PREAMBLE_SIZE)
        || identifier != Some(ACN_PACKET_IDENTIFIER.as_slice())
    {
        return Err(PacketRejection::NotAcn);
    }

    let root_vector = read_u32(buf, OFFSET_ROOT_VECTOR).ok_or(too_short)?;
    if root_vector != VECTOR_ROOT_E131_DATA {
        return Err(PacketRejection::RootVector(root_vector));
    }

    let framing_vector = read_u32(buf, OFFSET_FRAMING_VECTOR).ok_or(too_short)?;
    if framing_vector != VECTOR_E131_DATA_PACKET {
        return Err(PacketRejection::FramingVector(framing_vector));
    }

    let dmp_vector = read_u8(buf, OFFSET_DMP_VECTOR).ok_or(too_short)?;
    if dmp_vector != VECTOR_DMP_SET_PROPERTY {
        return Err(PacketRejection::DmpVector(dmp_vector));
    }

    let start_code = read_u8(buf, OFFSET_START_CODE).ok_or(too_short)?;
    if start_code != DMX_START_CODE {
        return Err(PacketRejection::StartCode(start_code));
    }

    let universe = read_u16(buf, OFFSET_UNIVERSE).ok_or(too_short)?;
    let sequence = read_u8(buf, OFFSET_SEQUENCE).ok_or(too_short)?;
    let options = read_u8(buf, OFFSET_OPTIONS).ok_or(too_short)?;
    let property_count = read_u16(buf, OFFSET_PROPERTY_COUNT).ok_or(too_short)?;

    // The property count includes the start code.
    let declared = usize::from(property_count).saturating_sub(1);
    let available = buf.len().saturating_sub(OFFSET_SLOTS);
    let slot_count = declared.min(available).min(MAX_SLOTS);
    let end = OFFSET_SLOTS.saturating_add(slot_count);
    let slots = buf.get(OFFSET_SLOTS..end).ok_or(too_short)?;

    Ok(DmxFrame {
        universe,
        sequence,
        stream_terminated: options & OPTION_STREAM_TERMINATED != 0,
        slots,
    })
}

/// Multicast group carrying `universe` (`239.255.hi.lo`).
pub const fn multicast_group(universe: u16) -> std::net::Ipv4Addr {
    let [hi, lo] = universe.to_be_bytes();
    std::net::Ipv4Addr::new(239, 255, hi, lo)
}

fn flags_and_length(total: usize, offset: usize) -> [u8; 2] {
    let length = u16::try_from(total.saturating_sub(offset)).unwrap_or(0x0fff) & 0x0fff;
    (FLAGS | length).to_be_bytes()
}

fn put(buf: &mut [u8], offset: usize, bytes: &[u8]) {
    if let Some(dst) = buf.get_mut(offset..offset.saturating_add(bytes.len())) {
        dst.copy_from_slice(bytes);
    }
}

/// Encode an E1.31 data packet.
///
/// Used by loopback tooling and tests to emit frames the decoder accepts.
/// At most [`MAX_SLOTS`] slots are encoded.
pub fn build_data_packet(universe: u16, sequence: u8, source_name: &str, slots: &[u8]) -> Vec<u8> {
    let slots = slots.get(..slots.len().min(MAX_SLOTS)).unwrap_or_default();
    let total = OFFSET_SLOTS.saturating_add(slots.len());
    let mut buf = vec![0_u8; total];

    put(&mut buf, OFFSET_PREAMBLE, &PREAMBLE_SIZE.to_be_bytes());
    put(&mut buf, OFFSET_IDENTIFIER, ACN_PACKET_IDENTIFIER);
    put(&mut buf, OFFSET_ROOT_LENGTH, &flags_and_length(total, OFFSET_ROOT_LENGTH));
    put(&mut buf, OFFSET_ROOT_VECTOR, &VECTOR_ROOT_E131_DATA.to_be_bytes());
    put(&mut buf, OFFSET_CID, b"epsilon-bridge\0\0");
    put(&mut buf, OFFSET_FRAMING_LENGTH, &flags_and_length(total, OFFSET_FRAMING_LENGTH));
    put(&mut buf, OFFSET_FRAMING_VECTOR, &VECTOR_E131_DATA_PACKET.to_be_bytes());
    let name = source_name.as_bytes();
    put(&mut buf, OFFSET_SOURCE_NAME, name.get(..name.len().min(63)).unwrap_or_default());
    put(&mut buf, OFFSET_PRIORITY, &[100]);
    put(&mut buf, OFFSET_SEQUENCE, &[sequence]);
    put(&mut buf, OFFSET_UNIVERSE, &universe.to_be_bytes());
    put(&mut buf, OFFSET_DMP_LENGTH, &flags_and_length(total, OFFSET_DMP_LENGTH));
    put(&mut buf, OFFSET_DMP_VECTOR, &[VECTOR_DMP_SET_PROPERTY]);
    put(&mut buf, OFFSET_ADDRESS_TYPE, &[DMP_ADDRESS_TYPE]);
    put(&mut buf, OFFSET_ADDRESS_INCREMENT, &1_u16.to_be_bytes());
    let property_count = u16::try_from(slots.len().saturating_add(1)).unwrap_or(u16::MAX);
    put(&mut buf, OFFSET_PROPERTY_COUNT, &property_count.to_be_bytes());
    put(&mut buf, OFFSET_START_CODE, &[DMX_START_CODE]);
    put(&mut buf, OFFSET_SLOTS, slots);
    buf
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_universe_and_slots() {
        let packet = build_data_packet(2, 7, "test", &[10, 20, 30]);
        let frame = parse_data_packet(&packet).unwrap();
        assert_eq!(frame.universe, 2);
        assert_eq!(frame.sequence, 7);
        assert_eq!(frame.slots, &[10, 20, 30]);
        assert!(!frame.stream_terminated);
    }

    #[test]
    fn rejects_truncated_datagram() {
        let packet = build_data_packet(2, 0, "test", &[1, 2, 3]);
        let truncated = packet.get(..100).unwrap_or_default();
        assert_eq!(parse_data_packet(truncated), Err(PacketRejection::TooShort(100)));
    }

    #[test]
    fn rejects_foreign_identifier() {
        let mut packet = build_data_packet(2, 0, "test", &[1]);
        put(&mut packet, OFFSET_IDENTIFIER, b"Art-Net\0\0\0\0\0");
        assert_eq!(parse_data_packet(&packet), Err(PacketRejection::NotAcn));
    }

    #[test]
    fn rejects_alternate_start_code() {
        let mut packet = build_data_packet(2, 0, "test", &[1]);
        put(&mut packet, OFFSET_START_CODE, &[0xdd]);
        assert_eq!(parse_data_packet(&packet), Err(PacketRejection::StartCode(0xdd)));
    }

    #[test]
    fn rejects_sync_packets() {
        let mut packet = build_data_packet(2, 0, "test", &[1]);
        put(&mut packet, OFFSET_ROOT_VECTOR, &0x0000_0008_u32.to_be_bytes());
        assert_eq!(parse_data_packet(&packet), Err(PacketRejection::RootVector(8)));
    }

    #[test]
    fn property_count_bounds_payload() {
        let mut packet = build_data_packet(2, 0, "test", &[1, 2, 3, 4]);
        put(&mut packet, OFFSET_PROPERTY_COUNT, &3_u16.to_be_bytes());
        let frame = parse_data_packet(&packet).unwrap();
        assert_eq!(frame.slots, &[1, 2]);
    }

    #[test]
    fn multicast_group_splits_universe() {
        assert_eq!(multicast_group(2), std::net::Ipv4Addr::new(239, 255, 0, 2));
        assert_eq!(multicast_group(0x0102), std::net::Ipv4Addr::new(239, 255, 1, 2));
    }
}
