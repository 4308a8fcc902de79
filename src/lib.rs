//! A process-local generator of time-based 128-bit GUIDs rendered as 32
//! uppercase hexadecimal characters.
//!
//! ```rust
//! let guid = guid128::generate();
//! println!("{}", guid); // e.g., "A7D90563829C7C01C26A802B44C5BED1"
//!
//! let guid = guid128::new_guid();
//! println!("{:?}", guid.to_bytes()); // as 16-byte structural array
//! ```
//!
//! # Field and bit layout
//!
//! Identifiers are composed of a 60-bit adjusted timestamp, a clock sequence
//! that protects against clock regression, and a 6-byte pseudo hardware
//! address, packed into the following structural octet layout:
//!
//! ```text
//! |<------------------------- 32 bits -------------------------->| Octet
//!
//! +---------------------------------------------------------------+
//! |                           time_low                            | 0-3
//! +-------------------------------+-------------------------------+
//! |           time_mid            |  ver  |       time_high       | 4-7
//! +---------------+---------------+-------+-----------------------+
//! |res| clkSeqHi  |   clkSeqLow   |                               | 8-9
//! +---------------+---------------+                               |
//! |                            node id                            | 10-15
//! +---------------------------------------------------------------+
//! ```
//!
//! Where:
//!
//! - The 4-bit `ver` field is set at `1010`.
//! - The 2-bit `res` field is set at `11`.
//! - The high bit of the first `node id` byte is always set, marking the
//!   address as locally administered; it can never collide with a registered
//!   hardware address.
//!
//! The text representation emits the timestamp fields high-to-low —
//! `time_high_and_version`, `time_mid`, `time_low`, the clock-sequence
//! bytes, then the node identifier — which differs from both the octet
//! layout above and the 8-4-4-4-12 grouping of common UUID text formats.
//! The order is part of the emitted format and is preserved as is.
//!
//! # Uniqueness under a degraded environment
//!
//! The generator never fails: every environmental shortfall selects a weaker
//! substitute instead of surfacing an error.
//!
//! - Repeated clock readings within one millisecond are disambiguated by a
//!   bounded adjustment counter; an exhausted counter re-samples the clock
//!   until it advances.
//! - A clock that moves backward reseeds the random clock sequence.
//! - Processes racing on one host are disambiguated, best-effort, through a
//!   transient lock token under the temp directory; a host that denies the
//!   filesystem access falls back to plain clock readings.
//! - The pseudo hardware address is a digest of ambient entropy; without a
//!   usable digest backend a polynomial hash stands in, and an unresolvable
//!   host address contributes loopback octets.
//!
//! Each degradation only increases collision probability; callers always
//! observe a well-formed 32-character identifier.

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod guid;
pub use guid::Guid;

#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
pub mod generator;
#[cfg(feature = "std")]
#[doc(inline)]
pub use generator::{Clock, Generator, SystemClock};

#[cfg(feature = "std")]
mod node_id;
#[cfg(feature = "std")]
mod process_lock;
#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
pub use process_lock::{LOCK_FILE_NAME, LOCK_POLL_INTERVAL, STALE_WAIT_WINDOW, UNIQUENESS_HOLD};

#[cfg(feature = "std")]
mod global_gen;
#[cfg(feature = "global_gen")]
pub use global_gen::{generate, new_guid};
