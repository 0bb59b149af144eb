//! # IOCtl Request Encoding
//!
//! A device-control request is a single `u32` packed as:
//!
//! ```text
//! bit  31........24 23..22 21..........8 7..........0
//!      group (8)    dir(2) payload size  number (8)
//!                          (14)
//! ```
//!
//! Packing direction and payload size into the request itself (rather than leaving
//! them to convention) is what lets [`decode`] validate a request's shape before a
//! driver's `ioctl` implementation ever sees it, and lets [`define_ioctl!`] give every
//! request constant a name that cannot collide with another group's.

const GROUP_SHIFT: u32 = 24;
const DIR_SHIFT: u32 = 22;
const SIZE_SHIFT: u32 = 8;
const NUMBER_MASK: u32 = 0xFF;
const DIR_MASK: u32 = 0b11;
const SIZE_MASK: u32 = 0x3FFF;

/// Direction of the payload relative to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// No payload.
    None = 0,
    /// Caller writes, driver reads.
    Write = 1,
    /// Driver writes, caller reads.
    Read = 2,
    /// Both directions (read-modify-write).
    ReadWrite = 3,
}

impl Direction {
    const fn from_bits(bits: u32) -> Direction {
        match bits {
            0 => Direction::None,
            1 => Direction::Write,
            2 => Direction::Read,
            _ => Direction::ReadWrite,
        }
    }
}

/// The decoded fields of an ioctl request code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub group: u8,
    pub direction: Direction,
    pub payload_size: u16,
    pub number: u8,
}

/// Pack a request's fields into the wire-level `u32` code. `payload_size` is masked to
/// 14 bits; callers exceeding that range get a silently truncated size rather than a
/// panic, matching the original ioctl convention of a fixed-width, lossy encoding.
pub const fn encode(group: u8, direction: Direction, payload_size: u16, number: u8) -> u32 {
    ((group as u32) << GROUP_SHIFT)
        | ((direction as u32 & DIR_MASK) << DIR_SHIFT)
        | ((payload_size as u32 & SIZE_MASK) << SIZE_SHIFT)
        | (number as u32 & NUMBER_MASK)
}

/// Unpack a request code back into its fields.
pub const fn decode(code: u32) -> Request {
    Request {
        group: (code >> GROUP_SHIFT) as u8,
        direction: Direction::from_bits((code >> DIR_SHIFT) & DIR_MASK),
        payload_size: ((code >> SIZE_SHIFT) & SIZE_MASK) as u16,
        number: (code & NUMBER_MASK) as u8,
    }
}

/// Define a group of ioctl request constants sharing one `group` byte, each guaranteed
/// unique by construction since `(group, number)` together determine the low bits of
/// the code.
///
/// ```
/// use ember_core::ioctl::Direction;
/// use ember_core::define_ioctl;
///
/// define_ioctl! {
///     group: 1,
///     pub const IOCTL_UART_SET_BAUD = (Direction::Write, 4, 0);
///     pub const IOCTL_UART_GET_BAUD = (Direction::Read, 4, 1);
/// }
///
/// assert_ne!(IOCTL_UART_SET_BAUD, IOCTL_UART_GET_BAUD);
/// ```
#[macro_export]
macro_rules! define_ioctl {
    (group: $group:expr, $(pub const $name:ident = ($dir:expr, $size:expr, $num:expr);)+) => {
        $(
            pub const $name: u32 = $crate::ioctl::encode($group, $dir, $size, $num);
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_all_fields() {
        let code = encode(0x42, Direction::ReadWrite, 1200, 7);
        let decoded = decode(code);
        assert_eq!(decoded.group, 0x42);
        assert_eq!(decoded.direction, Direction::ReadWrite);
        assert_eq!(decoded.payload_size, 1200);
        assert_eq!(decoded.number, 7);
    }

    #[test]
    fn oversized_payload_is_masked_not_rejected() {
        let code = encode(1, Direction::Write, 0xFFFF, 0);
        assert_eq!(decode(code).payload_size, 0xFFFF & SIZE_MASK as u16);
    }

    #[test]
    fn distinct_groups_or_numbers_never_collide() {
        let a = encode(1, Direction::Write, 4, 0);
        let b = encode(1, Direction::Write, 4, 1);
        let c = encode(2, Direction::Write, 4, 0);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn direction_bits_survive_encoding() {
        for d in [Direction::None, Direction::Write, Direction::Read, Direction::ReadWrite] {
            assert_eq!(decode(encode(9, d, 0, 0)).direction, d);
        }
    }
}
