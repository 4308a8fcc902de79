//! Pseudo hardware-address derivation.
//!
//! No genuine hardware identifier is accessible, so the 6-byte node
//! identifier is a hash of ambient entropy, computed once per process. Every
//! failure along the way selects a weaker input or hash path instead of
//! propagating.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::sync::OnceLock;

use md5::{Digest, Md5};

const NODE_ID_LEN: usize = 6;

/// Hash backend used for node derivation, probed once per process.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum DigestProvider {
    /// The linked MD5 implementation.
    Md5,
    /// Polynomial rolling hash, for environments without a usable digest.
    Polynomial,
}

fn provider() -> DigestProvider {
    static PROVIDER: OnceLock<DigestProvider> = OnceLock::new();
    *PROVIDER.get_or_init(probe)
}

/// Checks that the digest backend produces enough output for a node id. The
/// backend is linked statically, so the probe is a self-check of the output
/// width rather than a provider-registry lookup.
fn probe() -> DigestProvider {
    if <Md5 as Digest>::output_size() >= NODE_ID_LEN {
        DigestProvider::Md5
    } else {
        tracing::warn!("digest backend unusable, deriving node id with the polynomial hash");
        DigestProvider::Polynomial
    }
}

/// Derives the 6-byte pseudo hardware address from the process-unique
/// timestamp and the ambient entropy of the environment.
pub(crate) fn derive(unique_timestamp: u64) -> [u8; 6] {
    derive_from_material(provider(), &entropy_material(unique_timestamp))
}

fn derive_from_material(provider: DigestProvider, material: &[u8]) -> [u8; 6] {
    let mut node = match provider {
        DigestProvider::Md5 => {
            let digest = Md5::digest(material);
            let mut node = [0u8; NODE_ID_LEN];
            node.copy_from_slice(&digest[..NODE_ID_LEN]);
            node
        }
        DigestProvider::Polynomial => polynomial_node(material),
    };
    // locally administered, never a registered hardware address
    node[0] |= 0x80;
    node
}

/// Additive hash over signed bytes, `h = 31 * h + b`, rendered as lowercase
/// hex text. A text shorter than six bytes sits at the end of a zeroed
/// buffer; a longer one contributes its last six bytes, the most varying
/// ones.
fn polynomial_node(material: &[u8]) -> [u8; 6] {
    let mut hash: i32 = 0;
    for &b in material {
        hash = hash.wrapping_mul(31).wrapping_add((b as i8) as i32);
    }

    let text = format!("{:x}", hash as u32);
    let bytes = text.as_bytes();
    let mut node = [0u8; NODE_ID_LEN];
    if bytes.len() < NODE_ID_LEN {
        node[NODE_ID_LEN - bytes.len()..].copy_from_slice(bytes);
    } else {
        node.copy_from_slice(&bytes[bytes.len() - NODE_ID_LEN..]);
    }
    node
}

/// Concatenates the entropy the node id is derived from: the process-unique
/// timestamp, the host address, the location of a fresh heap allocation, and
/// the runtime memory figures.
fn entropy_material(unique_timestamp: u64) -> Vec<u8> {
    let mut material = Vec::with_capacity(64);
    material.extend_from_slice(unique_timestamp.to_string().as_bytes());
    match host_address() {
        IpAddr::V4(v4) => material.extend_from_slice(&v4.octets()),
        IpAddr::V6(v6) => material.extend_from_slice(&v6.octets()),
    }
    material.extend_from_slice(format!("{:x}", heap_probe()).as_bytes());
    let (free, total) = memory_figures();
    material.extend_from_slice(free.to_string().as_bytes());
    material.extend_from_slice(total.to_string().as_bytes());
    material
}

/// Address of the primary network interface, or loopback when resolution
/// fails. Connecting a UDP socket selects the interface; no datagram leaves
/// the host.
fn host_address() -> IpAddr {
    fn resolve() -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect(("8.8.8.8", 53))?;
        Ok(socket.local_addr()?.ip())
    }

    resolve().unwrap_or_else(|err| {
        tracing::debug!(%err, "host address resolution failed, using loopback");
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    })
}

/// Address of a fresh heap allocation, an address-space entropy source.
fn heap_probe() -> usize {
    let probe = Box::new(0u8);
    &*probe as *const u8 as usize
}

/// Free and total memory figures in kilobytes, read from /proc on Linux.
/// Elsewhere, or when the read fails, both figures are zero; the remaining
/// material still differentiates the input.
#[cfg(target_os = "linux")]
fn memory_figures() -> (u64, u64) {
    fn read() -> Option<(u64, u64)> {
        let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
        let field = |name: &str| -> Option<u64> {
            meminfo
                .lines()
                .find(|line| line.starts_with(name))?
                .split_whitespace()
                .nth(1)?
                .parse()
                .ok()
        };
        Some((field("MemFree:")?, field("MemTotal:")?))
    }

    read().unwrap_or((0, 0))
}

#[cfg(not(target_os = "linux"))]
fn memory_figures() -> (u64, u64) {
    (0, 0)
}
