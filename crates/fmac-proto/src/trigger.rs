//! Trigger frames.
//!
//! A caller sends its signed challenge as a length-prefixed frame:
//!
//! ```text
//! +--------+--------+-------------------+
//! | len (u16, BE)   | signature bytes   |
//! +--------+--------+-------------------+
//! ```
//!
//! The daemon answers with a tag byte, followed by the capability grant
//! when one was issued:
//!
//! ```text
//! 0x00                          rejected
//! 0x01                          admitted, no capability
//! 0x02 handle:i32 version:u32 flags:u32  (all BE)
//! ```
//!
//! A rejection never says *why*; the caller learns nothing it could use
//! as an oracle.

/// Largest challenge payload a frame may carry.
pub const MAX_FRAME_LEN: usize = 512;

const TAG_REJECTED: u8 = 0x00;
const TAG_ADMITTED: u8 = 0x01;
const TAG_GRANTED: u8 = 0x02;
const GRANT_LEN: usize = 12;

/// Capability delivered to an admitted caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityGrant {
    /// Handle number in the caller's namespace.
    pub handle: i32,
    /// Protocol version spoken over the shared region.
    pub protocol_version: u32,
    /// Deployment flags.
    pub flags: u32,
}

/// Daemon answer to one trigger frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReply {
    /// Not admitted. Carries no reason.
    Rejected,
    /// Admitted; no capability was requested or issued.
    Admitted,
    /// Admitted and a capability was issued.
    Granted(CapabilityGrant),
}

impl TriggerReply {
    /// Whether the caller was admitted.
    pub fn is_admitted(&self) -> bool {
        !matches!(self, TriggerReply::Rejected)
    }
}

#[cfg(feature = "tokio")]
mod codec {
    use bytes::{Buf, BufMut, BytesMut};
    use tokio_util::codec::{Decoder, Encoder};

    use super::*;
    use crate::error::FrameError;

    /// Server side: decodes challenge frames, encodes replies.
    #[derive(Debug, Clone)]
    pub struct TriggerCodec {
        max_len: usize,
    }

    impl TriggerCodec {
        /// Codec accepting frames up to [`MAX_FRAME_LEN`].
        pub fn new() -> Self {
            Self {
                max_len: MAX_FRAME_LEN,
            }
        }
    }

    impl Default for TriggerCodec {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Decoder for TriggerCodec {
        type Item = BytesMut;
        type Error = FrameError;

        fn decode(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, FrameError> {
            if src.len() < 2 {
                return Ok(None);
            }
            let len = usize::from(u16::from_be_bytes([src[0], src[1]]));
            if len > self.max_len {
                return Err(FrameError::FrameTooLong {
                    actual: len,
                    limit: self.max_len,
                });
            }
            if src.len() < 2 + len {
                src.reserve(2 + len - src.len());
                return Ok(None);
            }
            src.advance(2);
            Ok(Some(src.split_to(len)))
        }
    }

    impl Encoder<TriggerReply> for TriggerCodec {
        type Error = FrameError;

        fn encode(&mut self, reply: TriggerReply, dst: &mut BytesMut) -> Result<(), FrameError> {
            match reply {
                TriggerReply::Rejected => dst.put_u8(TAG_REJECTED),
                TriggerReply::Admitted => dst.put_u8(TAG_ADMITTED),
                TriggerReply::Granted(grant) => {
                    dst.reserve(1 + GRANT_LEN);
                    dst.put_u8(TAG_GRANTED);
                    dst.put_i32(grant.handle);
                    dst.put_u32(grant.protocol_version);
                    dst.put_u32(grant.flags);
                }
            }
            Ok(())
        }
    }

    /// Client side: encodes challenge frames, decodes replies.
    #[derive(Debug, Clone, Default)]
    pub struct TriggerClientCodec;

    impl Encoder<&[u8]> for TriggerClientCodec {
        type Error = FrameError;

        fn encode(&mut self, challenge: &[u8], dst: &mut BytesMut) -> Result<(), FrameError> {
            if challenge.len() > MAX_FRAME_LEN {
                return Err(FrameError::FrameTooLong {
                    actual: challenge.len(),
                    limit: MAX_FRAME_LEN,
                });
            }
            dst.reserve(2 + challenge.len());
            dst.put_u16(challenge.len() as u16);
            dst.put_slice(challenge);
            Ok(())
        }
    }

    impl Decoder for TriggerClientCodec {
        type Item = TriggerReply;
        type Error = FrameError;

        fn decode(&mut self, src: &mut BytesMut) -> Result<Option<TriggerReply>, FrameError> {
            let Some(&tag) = src.first() else {
                return Ok(None);
            };
            match tag {
                TAG_REJECTED => {
                    src.advance(1);
                    Ok(Some(TriggerReply::Rejected))
                }
                TAG_ADMITTED => {
                    src.advance(1);
                    Ok(Some(TriggerReply::Admitted))
                }
                TAG_GRANTED => {
                    if src.len() < 1 + GRANT_LEN {
                        return Ok(None);
                    }
                    src.advance(1);
                    Ok(Some(TriggerReply::Granted(CapabilityGrant {
                        handle: src.get_i32(),
                        protocol_version: src.get_u32(),
                        flags: src.get_u32(),
                    })))
                }
                other => Err(FrameError::UnknownReplyTag(other)),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn partial_frames_wait_for_more() {
            let mut codec = TriggerCodec::new();
            let mut buf = BytesMut::from(&[0x00, 0x03, 0xaa][..]);
            assert!(codec.decode(&mut buf).unwrap().is_none());
            buf.extend_from_slice(&[0xbb, 0xcc, 0x00]);
            let frame = codec.decode(&mut buf).unwrap().unwrap();
            assert_eq!(&frame[..], &[0xaa, 0xbb, 0xcc]);
            assert_eq!(&buf[..], &[0x00]);
        }

        #[test]
        fn oversized_frame_is_an_error() {
            let mut codec = TriggerCodec::new();
            let mut buf = BytesMut::from(&[0xff, 0xff][..]);
            assert!(matches!(
                codec.decode(&mut buf),
                Err(FrameError::FrameTooLong { actual: 65535, .. })
            ));
        }

        #[test]
        fn empty_frame_is_delivered() {
            let mut codec = TriggerCodec::new();
            let mut buf = BytesMut::from(&[0x00, 0x00][..]);
            assert_eq!(codec.decode(&mut buf).unwrap().map(|f| f.len()), Some(0));
        }

        #[test]
        fn grant_reply_layout() {
            let mut codec = TriggerCodec::new();
            let mut buf = BytesMut::new();
            let grant = CapabilityGrant {
                handle: 7,
                protocol_version: 1,
                flags: 0x10,
            };
            codec.encode(TriggerReply::Granted(grant), &mut buf).unwrap();
            assert_eq!(
                &buf[..],
                &[2, 0, 0, 0, 7, 0, 0, 0, 1, 0, 0, 0, 0x10]
            );

            let mut client = TriggerClientCodec;
            let partial = buf.split_to(5);
            let mut head = partial.clone();
            assert!(client.decode(&mut head).unwrap().is_none());
            let mut whole = partial;
            whole.unsplit(buf);
            assert_eq!(
                client.decode(&mut whole).unwrap(),
                Some(TriggerReply::Granted(grant))
            );
        }

        #[test]
        fn unknown_tag_is_rejected() {
            let mut client = TriggerClientCodec;
            let mut buf = BytesMut::from(&[0x09][..]);
            assert!(matches!(
                client.decode(&mut buf),
                Err(FrameError::UnknownReplyTag(0x09))
            ));
        }
    }
}

#[cfg(feature = "tokio")]
pub use self::codec::{TriggerClientCodec, TriggerCodec};
