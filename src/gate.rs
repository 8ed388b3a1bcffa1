use log::warn;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Longest window a single report can open.
pub const MAX_COOLDOWN: Duration = Duration::from_secs(86_400 * 365);

/// Shared cooldown window announced by the server.
///
/// Holds a single resume-at deadline. Reports only ever push the deadline
/// forward; every request waits on it before going out.
#[derive(Debug)]
pub struct RateGate {
    resume_at: Mutex<Instant>,
}

impl Default for RateGate {
    fn default() -> Self {
        Self::new()
    }
}

impl RateGate {
    pub fn new() -> Self {
        Self {
            resume_at: Mutex::new(Instant::now()),
        }
    }

    /// Extend the window to at least `now + seconds`. Never shortens it.
    /// Hints longer than [`MAX_COOLDOWN`] are capped.
    pub fn report_cooldown(&self, seconds: u64) {
        let mut wait = Duration::from_secs(seconds);
        if wait > MAX_COOLDOWN {
            warn!("Cooldown of {}s capped to {:?}", seconds, MAX_COOLDOWN);
            wait = MAX_COOLDOWN;
        }
        let Some(candidate) = Instant::now().checked_add(wait) else {
            warn!("Cooldown of {:?} is past the clock range, ignoring it", wait);
            return;
        };
        let mut guard = self.resume_at.lock().unwrap_or_else(|p| p.into_inner());
        if candidate > *guard {
            *guard = candidate;
        }
    }

    pub fn resume_at(&self) -> Instant {
        *self.resume_at.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Time a caller would have to wait right now.
    pub fn remaining(&self) -> Duration {
        self.resume_at().saturating_duration_since(Instant::now())
    }

    /// Suspend until the window has passed. Re-checks after waking in case
    /// another request extended it meanwhile.
    pub async fn await_clear(&self) {
        let mut waited = false;
        loop {
            let deadline = self.resume_at();
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match wall_clock_after(remaining) {
                Some(wall) => warn!(
                    "Rate limit window active. Sleeping until {}",
                    wall.format("%H:%M:%S")
                ),
                None => warn!("Rate limit window active. Sleeping for {:?}", remaining),
            }
            tokio::time::sleep_until(deadline).await;
            waited = true;
        }
        if waited {
            warn!("Resuming requests at {}", chrono::Local::now().format("%H:%M:%S"));
        }
    }
}

fn wall_clock_after(wait: Duration) -> Option<chrono::DateTime<chrono::Local>> {
    let delta = chrono::Duration::from_std(wait).ok()?;
    chrono::Local::now().checked_add_signed(delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn starts_clear() {
        let gate = RateGate::new();
        let start = Instant::now();
        gate.await_clear().await;
        assert_eq!(Instant::now(), start);
        assert!(gate.remaining().is_zero());
    }

    #[tokio::test(start_paused = true)]
    async fn shorter_report_never_shrinks_window() {
        let gate = RateGate::new();
        let start = Instant::now();
        gate.report_cooldown(10);
        gate.report_cooldown(2);
        gate.report_cooldown(0);
        assert_eq!(gate.resume_at(), start + Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_reports_keep_the_max() {
        let gate = std::sync::Arc::new(RateGate::new());
        let start = Instant::now();
        let a = {
            let g = gate.clone();
            async move { g.report_cooldown(3) }
        };
        let b = {
            let g = gate.clone();
            async move { g.report_cooldown(7) }
        };
        futures::join!(b, a);
        assert_eq!(gate.resume_at(), start + Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_wake_after_deadline() {
        let gate = RateGate::new();
        let start = Instant::now();
        gate.report_cooldown(5);
        futures::join!(gate.await_clear(), gate.await_clear(), gate.await_clear());
        assert!(Instant::now() >= start + Duration::from_secs(5));
        assert!(gate.remaining().is_zero());
    }

    #[tokio::test(start_paused = true)]
    async fn waiter_follows_extension_made_while_sleeping() {
        let gate = RateGate::new();
        let start = Instant::now();
        gate.report_cooldown(2);
        let extend = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            gate.report_cooldown(4);
        };
        futures::join!(gate.await_clear(), extend);
        assert!(Instant::now() >= start + Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn huge_hint_is_capped() {
        let gate = RateGate::new();
        let start = Instant::now();
        gate.report_cooldown(u64::MAX);
        assert_eq!(gate.resume_at(), start + MAX_COOLDOWN);
        gate.report_cooldown(10_000_000_000_000);
        assert_eq!(gate.resume_at(), start + MAX_COOLDOWN);
        gate.await_clear().await;
        assert!(Instant::now() >= start + MAX_COOLDOWN);
    }

    #[test]
    fn wall_clock_out_of_range_is_none() {
        assert!(wall_clock_after(Duration::from_secs(10_000_000_000_000)).is_none());
        assert!(wall_clock_after(Duration::from_secs(u64::MAX)).is_none());
        assert!(wall_clock_after(Duration::from_secs(60)).is_some());
    }
}
