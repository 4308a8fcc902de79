//! Generator owning the process-wide identifier state.

use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;

use crate::{node_id, process_lock, Guid};

/// 100-nanosecond ticks between the start of the Gregorian calendar
/// (1582-10-15) and the Unix epoch (1970-01-01).
pub const GREGORIAN_UNIX_DELTA_TICKS: u64 = 0x01B2_1DD2_1381_4000;

/// Ceiling for the same-tick adjustment counter. The clock is read at
/// millisecond granularity, so the counter stays below the 10,000 ticks that
/// make up one millisecond and adjusted timestamps never reach into the next
/// reading.
pub const MAX_TICK_ADJUSTMENT: u32 = 9_999;

const TICKS_PER_MILLI: u64 = 10_000;

/// A source of 100-nanosecond Gregorian-epoch ticks.
///
/// The generator re-samples its clock while waiting out an exhausted
/// adjustment counter, so the clock is a stateful seam rather than a one-shot
/// argument. Tests inject scripted clocks through it.
pub trait Clock {
    /// Returns the current tick count.
    fn now_ticks(&mut self) -> u64;
}

/// Clock backed by the system real-time clock, read at millisecond
/// granularity and scaled to 100-nanosecond ticks.
///
/// A system clock set before the Unix epoch reads as zero milliseconds;
/// generation carries on and the regression handling covers the eventual
/// forward jump.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ticks(&mut self) -> u64 {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64);
        millis * TICKS_PER_MILLI + GREGORIAN_UNIX_DELTA_TICKS
    }
}

/// Represents a GUID generator that encapsulates the adjusted-timestamp and
/// clock-sequence state shared by all identifiers it produces.
///
/// The generator takes `&mut self`; sharing one across threads goes through a
/// mutual-exclusion lock, which is what serializes identifier creation within
/// a process. The following example shares a private generator with Rust's
/// standard synchronization mechanism; [`generate()`](crate::generate) wraps a
/// process-wide instance of the same construction.
///
/// # Examples
///
/// ```rust
/// use rand::rngs::OsRng;
/// use std::{sync, thread};
/// use guid128::Generator;
///
/// let g = sync::Arc::new(sync::Mutex::new(Generator::new(OsRng)));
/// thread::scope(|s| {
///     for i in 0..4 {
///         let g = sync::Arc::clone(&g);
///         s.spawn(move || {
///             for _ in 0..8 {
///                 println!("{} by thread {}", g.lock().unwrap().generate(), i);
///                 thread::yield_now();
///             }
///         });
///     }
/// });
/// ```
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Generator<R, C = SystemClock> {
    last_timestamp: u64,
    clock_sequence: u64,
    adjustment: u32,
    node_id: Option<[u8; 6]>,

    /// The random number generator used to seed and reseed the clock sequence.
    rng: R,
    clock: C,
}

impl<R: RngCore> Generator<R> {
    /// Creates a generator instance backed by the system clock.
    pub const fn new(rng: R) -> Self {
        Self::with_clock(rng, SystemClock)
    }
}

impl<R: RngCore, C: Clock> Generator<R, C> {
    /// Creates a generator instance with a custom tick source.
    pub const fn with_clock(rng: R, clock: C) -> Self {
        Self {
            last_timestamp: 0,
            clock_sequence: 0,
            adjustment: 0,
            node_id: None,
            rng,
            clock,
        }
    }

    /// Generates a new GUID.
    ///
    /// The first call on a generator consults the cross-process lock
    /// coordinator and derives the node identifier, which takes a fraction of
    /// a second; subsequent calls only touch the timestamp state.
    pub fn generate(&mut self) -> Guid {
        let node_id = match self.node_id {
            Some(node_id) => node_id,
            None => self.initialize(),
        };
        let timestamp = self.next_timestamp();
        Guid::from_parts(timestamp, self.clock_sequence, node_id)
    }

    /// Seeds the node identifier and clock sequence, once per generator.
    fn initialize(&mut self) -> [u8; 6] {
        let unique_timestamp = process_lock::acquire_unique_timestamp();
        let node_id = node_id::derive(unique_timestamp);
        self.clock_sequence = self.rng.next_u64();
        self.node_id = Some(node_id);
        node_id
    }

    /// Produces the next adjusted timestamp.
    ///
    /// `last_timestamp` records the raw clock reading; the returned value adds
    /// the same-tick adjustment on top, so repeated calls within one reading
    /// yield strictly increasing results. When the clock moves backward the
    /// clock sequence is reseeded instead, trading monotonicity for
    /// uniqueness. At the adjustment ceiling the clock is re-sampled, with a
    /// yield between iterations, until it advances.
    fn next_timestamp(&mut self) -> u64 {
        loop {
            let now = self.clock.now_ticks();
            if now < self.last_timestamp {
                // clock went backward; a fresh sequence keeps ids unique
                self.clock_sequence = self.rng.next_u64();
                self.adjustment = 0;
            } else if now > self.last_timestamp {
                self.adjustment = 0;
            } else {
                if self.adjustment >= MAX_TICK_ADJUSTMENT {
                    thread::yield_now();
                    continue;
                }
                self.adjustment += 1;
            }
            self.last_timestamp = now;
            return now + u64::from(self.adjustment);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, Generator, GREGORIAN_UNIX_DELTA_TICKS, MAX_TICK_ADJUSTMENT};
    use rand::rngs::mock::StepRng;

    /// Replays a fixed tick script, holding at the final value.
    struct ScriptClock {
        ticks: Vec<u64>,
        pos: usize,
    }

    impl ScriptClock {
        fn new(ticks: Vec<u64>) -> Self {
            Self { ticks, pos: 0 }
        }
    }

    impl Clock for ScriptClock {
        fn now_ticks(&mut self) -> u64 {
            let t = self.ticks[self.pos];
            if self.pos + 1 < self.ticks.len() {
                self.pos += 1;
            }
            t
        }
    }

    const NODE: [u8; 6] = [0x8A, 0x1B, 0x2C, 0x3D, 0x4E, 0x5F];
    const TICK: u64 = GREGORIAN_UNIX_DELTA_TICKS + 0x0123_4567_89AB * 10_000;
    const TIMESTAMP_MASK: u64 = 0x0FFF_FFFF_FFFF_FFFF;

    fn seeded(clock: ScriptClock) -> Generator<StepRng, ScriptClock> {
        let mut g = Generator::with_clock(StepRng::new(0x6666_6666_6666_6666, 0x1111), clock);
        g.node_id = Some(NODE);
        g.clock_sequence = 0x1234;
        g
    }

    /// Produces strictly increasing timestamps within one clock reading
    #[test]
    fn produces_strictly_increasing_timestamps_within_one_clock_reading() {
        let mut g = seeded(ScriptClock::new(vec![TICK]));
        let mut prev = g.generate().timestamp();
        assert_eq!(prev, TICK & TIMESTAMP_MASK);
        for i in 1..1_000u64 {
            let curr = g.generate().timestamp();
            assert_eq!(curr, prev + 1, "adjustment {i}");
            prev = curr;
        }
    }

    /// Reseeds the clock sequence when the clock moves backward
    #[test]
    fn reseeds_the_clock_sequence_when_the_clock_moves_backward() {
        let mut g = seeded(ScriptClock::new(vec![TICK, TICK - 200_000]));
        let before = g.generate();
        let after = g.generate();

        assert!(after.timestamp() < before.timestamp());
        assert_ne!(
            before.to_bytes()[8..10],
            after.to_bytes()[8..10],
            "clock-sequence bytes must change",
        );
    }

    /// Spins past the adjustment ceiling until the clock advances
    #[test]
    fn spins_past_the_adjustment_ceiling_until_the_clock_advances() {
        let mut g = seeded(ScriptClock::new(vec![TICK, TICK, TICK, TICK + 10_000]));
        g.last_timestamp = TICK;
        g.adjustment = MAX_TICK_ADJUSTMENT;

        let ceiling = (TICK + u64::from(MAX_TICK_ADJUSTMENT)) & TIMESTAMP_MASK;
        let next = g.generate().timestamp();
        assert_eq!(next, (TICK + 10_000) & TIMESTAMP_MASK);
        assert!(next > ceiling);
    }

    /// Generates distinct, time-ordered identifiers against the system clock
    #[test]
    fn generates_distinct_time_ordered_identifiers_against_the_system_clock() {
        use std::collections::HashSet;

        let mut g = Generator::new(rand::thread_rng());
        g.node_id = Some(NODE);
        g.clock_sequence = 0x0DDC;

        let samples: Vec<_> = (0..10_000).map(|_| g.generate()).collect();
        let mut prev = samples[0].timestamp();
        for e in &samples[1..] {
            assert!(e.timestamp() > prev);
            prev = e.timestamp();
        }

        let distinct: HashSet<String> = samples.iter().map(|e| e.to_string()).collect();
        assert_eq!(distinct.len(), samples.len());
    }

    /// Initializes node id and clock sequence on first use
    #[test]
    fn initializes_node_id_and_clock_sequence_on_first_use() {
        let mut g = Generator::new(rand::thread_rng());
        assert_eq!(g.node_id, None);
        let e = g.generate();
        let node = g.node_id.expect("node id must be cached after first use");
        assert_eq!(node[0] & 0x80, 0x80);
        assert_eq!(e.node(), &node);
    }
}
