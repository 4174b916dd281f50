//! Fragmentation codec
//!
//! Splits application payloads into radio-frame-sized fragments and builds
//! the wire frames that carry them.

use bytes::{BufMut, Bytes, BytesMut};

use super::{Error, HEADER_SIZE, Header, MAX_FRAGMENTS, Result};

/// One slice of a payload, ready to be framed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    /// Byte offset of this slice within the payload
    pub offset: usize,
    /// Length of this slice
    pub len: usize,
    /// Index while `split_more` is set, final index on the terminal fragment
    pub split_part: u8,
    /// More fragments follow
    pub split_more: bool,
}

impl Fragment {
    /// Byte range of this fragment within the payload
    #[must_use]
    pub const fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Payload bytes carried by one frame of `max_frame_size` bytes.
pub fn payload_per_frame(max_frame_size: usize) -> Result<usize> {
    match max_frame_size.checked_sub(HEADER_SIZE) {
        Some(capacity) if capacity > 0 => Ok(capacity),
        _ => Err(Error::InvalidFrameSize {
            frame: max_frame_size,
            header: HEADER_SIZE,
        }),
    }
}

/// Largest payload the fragment scheme can carry over frames of this size.
pub fn max_payload_len(max_frame_size: usize) -> Result<usize> {
    Ok(payload_per_frame(max_frame_size)? * MAX_FRAGMENTS)
}

/// Compute fragment boundaries for a payload.
///
/// Produces `ceil(payload_len / capacity)` fragments, and exactly one empty
/// fragment for an empty payload. Every fragment except the last has
/// `split_more` set and carries its own index; the last carries the fragment
/// count minus one.
///
/// # Errors
///
/// Returns an error if the frame cannot hold any payload, or if the payload
/// needs more than [`MAX_FRAGMENTS`] fragments.
pub fn fragment_plan(payload_len: usize, max_frame_size: usize) -> Result<Vec<Fragment>> {
    let capacity = payload_per_frame(max_frame_size)?;
    let count = payload_len.div_ceil(capacity).max(1);

    if count > MAX_FRAGMENTS {
        return Err(Error::PayloadTooLarge {
            size: payload_len,
            max: capacity * MAX_FRAGMENTS,
        });
    }

    let plan = (0..count)
        .map(|index| {
            let offset = index * capacity;
            let len = capacity.min(payload_len - offset);
            Fragment {
                offset,
                len,
                // count <= MAX_FRAGMENTS, so index fits in 7 bits
                split_part: index as u8,
                split_more: index + 1 < count,
            }
        })
        .collect();

    Ok(plan)
}

/// Build one wire frame from a header and its payload slice.
#[must_use]
pub fn encode_frame(header: &Header, payload: &[u8]) -> Bytes {
    let mut frame = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    frame.put_slice(&header.to_bytes());
    frame.put_slice(payload);
    frame.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{MessageType, decode_header};
    use proptest::prelude::*;

    #[test]
    fn test_seventy_bytes_over_32_byte_frames() {
        let plan = fragment_plan(70, 32).unwrap();
        let lens: Vec<usize> = plan.iter().map(|f| f.len).collect();
        assert_eq!(lens, vec![24, 24, 22]);

        assert!(plan[0].split_more && plan[0].split_part == 0);
        assert!(plan[1].split_more && plan[1].split_part == 1);
        assert!(!plan[2].split_more && plan[2].split_part == 2);
    }

    #[test]
    fn test_empty_payload_is_one_fragment() {
        let plan = fragment_plan(0, 32).unwrap();
        assert_eq!(
            plan,
            vec![Fragment {
                offset: 0,
                len: 0,
                split_part: 0,
                split_more: false
            }]
        );
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_empty_fragment() {
        let plan = fragment_plan(48, 32).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[1].len, 24);
        assert!(!plan[1].split_more);
    }

    #[test]
    fn test_frame_without_room_for_payload() {
        assert!(matches!(
            fragment_plan(1, HEADER_SIZE),
            Err(Error::InvalidFrameSize { .. })
        ));
        assert!(matches!(
            fragment_plan(1, 3),
            Err(Error::InvalidFrameSize { .. })
        ));
    }

    #[test]
    fn test_fragment_limit() {
        let max = max_payload_len(32).unwrap();
        assert_eq!(max, 24 * MAX_FRAGMENTS);
        assert_eq!(fragment_plan(max, 32).unwrap().len(), MAX_FRAGMENTS);
        assert!(matches!(
            fragment_plan(max + 1, 32),
            Err(Error::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_encode_frame() {
        let header = Header::new(MessageType::USER, 77, 3, 1, true);
        let frame = encode_frame(&header, b"abc");
        assert_eq!(frame.len(), HEADER_SIZE + 3);
        assert_eq!(decode_header(&frame).unwrap(), header);
        assert_eq!(&frame[HEADER_SIZE..], b"abc");
    }

    proptest! {
        /// Property: fragments tile the payload exactly, in order, without overlap
        #[test]
        fn prop_plan_tiles_payload(
            frame in (HEADER_SIZE + 1)..=64usize,
            fill in 0.0f64..=1.0,
        ) {
            let capacity = frame - HEADER_SIZE;
            let max = capacity * MAX_FRAGMENTS;
            let len = (max as f64 * fill) as usize;

            let plan = fragment_plan(len, frame).unwrap();
            prop_assert_eq!(plan.len(), len.div_ceil(capacity).max(1));

            let mut next = 0;
            for (index, fragment) in plan.iter().enumerate() {
                prop_assert_eq!(fragment.offset, next);
                prop_assert!(fragment.len <= capacity);
                let last = index + 1 == plan.len();
                prop_assert_eq!(fragment.split_more, !last);
                prop_assert_eq!(usize::from(fragment.split_part), index);
                next += fragment.len;
            }
            prop_assert_eq!(next, len);
        }
    }
}
