//! ## RTP: A Transport Protocol for Real-Time Applications
//!
//! [RFC3550]: https://tools.ietf.org/html/rfc3550
//! [RFC1890]: https://tools.ietf.org/html/rfc1890
//!
//! RTP provides end-to-end network transport functions suitable for
//! applications transmitting real-time data, such as audio, video or
//! simulation data, over multicast or unicast network services.  The
//! data transport is augmented by a control protocol (RTCP) to allow
//! monitoring of the data delivery in a manner scalable to large
//! multicast networks, and to provide minimal control and
//! identification functionality.  RTP and RTCP are designed to be
//! independent of the underlying transport and network layers.
//!
//! This crate is the wire codec only: it serializes and deserializes
//! RTP data packets and RTCP control packets ([RFC3550] sections 5 and
//! 6) to and from octet buffers in network byte order.  Decoding is
//! purely structural and carries no session state; the reception
//! statistics built on top of these types live in the session crate.

pub mod rtcp;
pub mod rtp;

use std::{array::TryFromSliceError, str::Utf8Error};

#[derive(Debug)]
pub enum Error {
    /// The buffer is smaller than the structure it is declared to hold.
    TooShort,
    /// The version field is not 2.
    BadVersion,
    /// An RTCP length field is inconsistent with the remaining buffer or
    /// with the packet-type-specific body size.
    LengthMismatch,
    /// An RTCP packet type or SDES item type outside the known range.
    UnknownKind(u8),
    Utf8Error(Utf8Error),
    TryFromSliceError(TryFromSliceError),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<Utf8Error> for Error {
    fn from(value: Utf8Error) -> Self {
        Self::Utf8Error(value)
    }
}

impl From<TryFromSliceError> for Error {
    fn from(value: TryFromSliceError) -> Self {
        Self::TryFromSliceError(value)
    }
}
