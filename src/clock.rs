//! CPU and wall clocks for stage timing.
//!
//! A [`Stopwatch`] captures three readings at start and again at stop:
//!
//! * wall time from [`std::time::Instant`] (monotonic),
//! * CPU time consumed by this process (`CLOCK_PROCESS_CPUTIME_ID`),
//! * CPU time consumed by reaped child processes (`RUSAGE_CHILDREN`).
//!
//! The child reading matters for the subprocess strategy, where nearly all
//! the work happens inside `convert` and `tesseract` and the harness itself
//! sits idle in `wait()`. It only advances once a child has been waited on,
//! which every stage does before it stops its stopwatch.
//!
//! On non-Unix hosts both CPU readings are zero.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// One timing measurement of one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// CPU time used by the harness process.
    #[serde(with = "duration_secs")]
    pub cpu: Duration,
    /// Elapsed real time.
    #[serde(with = "duration_secs")]
    pub wall: Duration,
    /// CPU time used by child processes that finished during the stage.
    #[serde(with = "duration_secs")]
    pub child_cpu: Duration,
}

impl Sample {
    pub fn new(cpu: Duration, wall: Duration) -> Self {
        Self {
            cpu,
            wall,
            child_cpu: Duration::ZERO,
        }
    }
}

/// Running measurement started by [`Stopwatch::start`].
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    wall: Instant,
    cpu: Duration,
    child_cpu: Duration,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            cpu: process_cpu_time(),
            child_cpu: children_cpu_time(),
            wall: Instant::now(),
        }
    }

    /// Elapsed readings since `start`.
    pub fn stop(&self) -> Sample {
        let wall = self.wall.elapsed();
        Sample {
            cpu: process_cpu_time().saturating_sub(self.cpu),
            wall,
            child_cpu: children_cpu_time().saturating_sub(self.child_cpu),
        }
    }
}

/// CPU time consumed so far by every thread of this process.
#[cfg(unix)]
pub fn process_cpu_time() -> Duration {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID, &mut ts) };
    if rc != 0 {
        return Duration::ZERO;
    }
    Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32)
}

#[cfg(not(unix))]
pub fn process_cpu_time() -> Duration {
    Duration::ZERO
}

/// User + system CPU time of all terminated, waited-for children.
#[cfg(unix)]
pub fn children_cpu_time() -> Duration {
    use std::mem::MaybeUninit;

    let mut usage = MaybeUninit::<libc::rusage>::uninit();
    let rc = unsafe { libc::getrusage(libc::RUSAGE_CHILDREN, usage.as_mut_ptr()) };
    if rc != 0 {
        return Duration::ZERO;
    }
    let usage = unsafe { usage.assume_init() };
    timeval_to_duration(usage.ru_utime) + timeval_to_duration(usage.ru_stime)
}

#[cfg(not(unix))]
pub fn children_cpu_time() -> Duration {
    Duration::ZERO
}

#[cfg(unix)]
fn timeval_to_duration(tv: libc::timeval) -> Duration {
    Duration::new(tv.tv_sec as u64, (tv.tv_usec as u32) * 1_000)
}

/// Serialise durations as fractional seconds.
pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopwatch_measures_wall_time() {
        let sw = Stopwatch::start();
        std::thread::sleep(Duration::from_millis(20));
        let s = sw.stop();
        assert!(s.wall >= Duration::from_millis(20), "got {:?}", s.wall);
    }

    #[cfg(unix)]
    #[test]
    fn busy_loop_accrues_cpu_time() {
        let sw = Stopwatch::start();
        let deadline = Instant::now() + Duration::from_millis(50);
        let mut x: u64 = 0;
        while Instant::now() < deadline {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
        }
        std::hint::black_box(x);
        let s = sw.stop();
        assert!(s.cpu > Duration::ZERO);
    }

    #[cfg(unix)]
    #[test]
    fn sleeping_does_not_accrue_much_cpu() {
        let sw = Stopwatch::start();
        std::thread::sleep(Duration::from_millis(100));
        let s = sw.stop();
        assert!(s.cpu < s.wall, "cpu {:?} wall {:?}", s.cpu, s.wall);
    }

    #[test]
    fn sample_serialises_as_seconds() {
        let s = Sample::new(Duration::from_millis(1500), Duration::from_secs(2));
        let json = serde_json::to_value(s).unwrap();
        assert_eq!(json["cpu"], 1.5);
        assert_eq!(json["wall"], 2.0);
        assert_eq!(json["child_cpu"], 0.0);
    }
}
