//! Best-effort cross-process timestamp disambiguation.
//!
//! Two processes on one host can read the same clock value. Creating a file
//! is the one operation the filesystem performs atomically, so a transient
//! lock token under the temp directory serves as an exclusion signal: the
//! process holding it sleeps past the clock granularity before stamping.
//! This reduces collision likelihood; it does not eliminate it, and every
//! failure degrades to the plain, non-atomic timestamp.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Name of the lock token under the platform temp directory. The token is a
/// shared convention: any process on the host implementing it participates.
pub const LOCK_FILE_NAME: &str = "guid.lock";

/// How long an acquired token is held before re-reading the clock, so that a
/// racing process cannot have observed the same reading.
pub const UNIQUENESS_HOLD: Duration = Duration::from_millis(100);

/// Upper bound on waiting for another holder before treating it as stale.
pub const STALE_WAIT_WINDOW: Duration = Duration::from_millis(1000);

/// Pause between creation attempts while another process holds the token.
pub const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Returns a timestamp in milliseconds that is, best-effort, distinct from
/// the one observed by any racing process on this host.
pub(crate) fn acquire_unique_timestamp() -> u64 {
    acquire_unique_timestamp_at(&std::env::temp_dir().join(LOCK_FILE_NAME))
}

/// Path-taking variant backing [`acquire_unique_timestamp`]; the token
/// location is a parameter so tests can run against private directories.
pub(crate) fn acquire_unique_timestamp_at(lock_path: &Path) -> u64 {
    let fallback = now_millis();

    // mtime of a pre-existing token; if it never advances within the wait
    // window, the holder crashed without releasing
    let initial_modified = modified_time(lock_path);
    let deadline = Instant::now() + STALE_WAIT_WINDOW;
    let mut may_remove_stale = true;

    loop {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(lock_path)
        {
            Ok(_) => break,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                if Instant::now() > deadline {
                    let stale = match (modified_time(lock_path), initial_modified) {
                        (Some(current), Some(initial)) => current <= initial,
                        // vanished since we first looked; retry the creation
                        (None, _) => true,
                        // appeared after our first look; the holder is live
                        (Some(_), None) => false,
                    };
                    if stale && may_remove_stale {
                        let _ = fs::remove_file(lock_path);
                        may_remove_stale = false;
                    } else {
                        tracing::debug!(
                            path = %lock_path.display(),
                            "lock token busy past the wait window, using the non-atomic timestamp"
                        );
                        return fallback;
                    }
                }
                thread::sleep(LOCK_POLL_INTERVAL);
            }
            Err(err) => {
                tracing::debug!(
                    %err,
                    path = %lock_path.display(),
                    "lock token unavailable, using the non-atomic timestamp"
                );
                return fallback;
            }
        }
    }

    // Holding the token: wait out the clock granularity, then read the
    // timestamp no racing holder can have observed.
    thread::sleep(UNIQUENESS_HOLD);
    let timestamp = now_millis();

    // a concurrent deletion already released the token for us
    let _ = fs::remove_file(lock_path);

    timestamp
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::{
        acquire_unique_timestamp_at, now_millis, LOCK_FILE_NAME, STALE_WAIT_WINDOW,
        UNIQUENESS_HOLD,
    };
    use std::path::Path;
    use std::time::{Duration, Instant};
    use std::{fs, thread};

    /// Acquires, stamps, and releases a fresh token
    #[test]
    fn acquires_stamps_and_releases_a_fresh_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE_NAME);

        let before = now_millis();
        let stamp = acquire_unique_timestamp_at(&path);

        // the hold sleep ran, so the stamp postdates the entry reading
        assert!(stamp >= before + UNIQUENESS_HOLD.as_millis() as u64);
        assert!(!path.exists(), "the token must be released");
    }

    /// Displaces a stale token and acquires
    #[test]
    fn displaces_a_stale_token_and_acquires() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE_NAME);
        fs::write(&path, b"").unwrap();

        let before = now_millis();
        let stamp = acquire_unique_timestamp_at(&path);

        assert!(stamp >= before + UNIQUENESS_HOLD.as_millis() as u64);
        assert!(!path.exists(), "the displaced token must be released");
    }

    /// Leaves a live holder's token in place and falls back
    #[test]
    fn leaves_a_live_holders_token_in_place_and_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE_NAME);
        fs::write(&path, b"").unwrap();

        let refresher = {
            let path = path.clone();
            thread::spawn(move || {
                // keep the holder looking alive past the wait window
                for _ in 0..15 {
                    thread::sleep(Duration::from_millis(100));
                    let _ = fs::write(&path, b"still held");
                }
            })
        };

        let stamp = acquire_unique_timestamp_at(&path);
        refresher.join().unwrap();

        assert!(stamp > 0);
        assert!(path.exists(), "a live holder's token must not be removed");
    }

    /// Degrades without waiting when the token cannot be created
    #[test]
    fn degrades_without_waiting_when_the_token_cannot_be_created() {
        let started = Instant::now();
        let stamp =
            acquire_unique_timestamp_at(Path::new("/nonexistent-guid128-dir/guid.lock"));

        assert!(stamp > 0);
        assert!(started.elapsed() < STALE_WAIT_WINDOW, "no poll loop on hard failure");
    }
}
