//! Process-wide generator and entry point functions.

#![cfg(feature = "global_gen")]
#![cfg_attr(docsrs, doc(cfg(feature = "global_gen")))]

use std::sync;

use crate::Guid;
use inner::GlobalGenInner;

/// Returns the lock handle of the process-wide generator, creating one if
/// none exists.
fn lock_global_gen() -> sync::MutexGuard<'static, GlobalGenInner> {
    static G: sync::OnceLock<sync::Mutex<GlobalGenInner>> = sync::OnceLock::new();
    G.get_or_init(Default::default)
        .lock()
        .expect("guid128: could not lock global generator")
}

/// Generates a GUID and renders it as 32 uppercase hexadecimal characters.
///
/// Equivalent to `new_guid().to_string()`; the lock is released before the
/// rendering happens, since the returned identifier is immutable.
///
/// # Examples
///
/// ```rust
/// let guid = guid128::generate();
/// assert_eq!(guid.len(), 32); // e.g., "A7D90563829C7C01C26A802B44C5BED1"
/// ```
pub fn generate() -> String {
    new_guid().to_string()
}

/// Generates a new GUID object.
///
/// This function employs a process-wide generator behind one
/// mutual-exclusion lock, which serializes identifier creation across
/// threads. On Unix, the generator state is rebuilt when the process ID
/// changes (i.e., upon process forks), so a child derives its own node
/// identifier and clock sequence instead of cloning the parent's.
///
/// # Examples
///
/// ```rust
/// let guid = guid128::new_guid();
/// println!("{}", guid); // e.g., "A7D90563829C7C01C26A802B44C5BED1"
/// println!("{:?}", guid.to_bytes()); // as 16-byte structural array
/// ```
pub fn new_guid() -> Guid {
    lock_global_gen().get_mut().generate()
}

mod inner {
    use rand::rngs::adapter::ReseedingRng;
    use rand::rngs::OsRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Core;

    use crate::Generator;

    /// The random number generator of the process-wide generator.
    ///
    /// [`ChaCha12Core`] with a [`ReseedingRng`] wrapper emulates the strategy
    /// used by [`rand::rngs::ThreadRng`], without the thread affinity.
    type GlobalGenRng = ReseedingRng<ChaCha12Core, OsRng>;

    const RESEED_THRESHOLD: u64 = 1024 * 64;

    /// A thin wrapper that rebuilds the generator state when the process ID
    /// changes (i.e., upon Unix forks).
    #[derive(Debug)]
    pub struct GlobalGenInner {
        #[cfg(unix)]
        pid: u32,
        generator: Generator<GlobalGenRng>,
    }

    impl Default for GlobalGenInner {
        fn default() -> Self {
            let core = ChaCha12Core::from_rng(OsRng)
                .expect("guid128: could not initialize global generator");
            Self {
                #[cfg(unix)]
                pid: std::process::id(),
                generator: Generator::new(ReseedingRng::new(core, RESEED_THRESHOLD, OsRng)),
            }
        }
    }

    impl GlobalGenInner {
        /// Returns a mutable reference to the inner [`Generator`] instance,
        /// resetting the state on Unix if the process ID has changed.
        pub fn get_mut(&mut self) -> &mut Generator<GlobalGenRng> {
            #[cfg(unix)]
            if self.pid != std::process::id() {
                *self = Default::default();
            }
            &mut self.generator
        }
    }
}
