use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// How the call window is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    /// Any interval of length `period` holds at most `calls` grants.
    #[default]
    Sliding,
    /// The counter resets at the end of each `period`, measured from the first grant.
    Fixed,
}

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Calls allowed per window.
    pub calls: u32,
    /// Window length.
    pub period: Duration,
    pub window: WindowKind,
}

impl RateLimiterConfig {
    pub fn new(calls: u32, period: Duration) -> Self {
        Self {
            calls,
            period,
            window: WindowKind::Sliding,
        }
    }

    pub fn with_window(mut self, window: WindowKind) -> Self {
        self.window = window;
        self
    }

    /// A limiter with `calls == 0` or a zero period lets everything through.
    pub fn is_unlimited(&self) -> bool {
        self.calls == 0 || self.period.is_zero()
    }
}

#[derive(Debug, Clone)]
pub struct RateLimiterSnapshot {
    pub calls: u32,
    pub period: Duration,
    /// Grants counted against the current window.
    pub in_window: usize,
    /// Estimated wait until the next grant (ms), if currently exhausted.
    pub estimated_wait_ms: Option<u64>,
}

#[derive(Debug)]
struct State {
    /// Grant instants inside the current sliding window, oldest first.
    grants: VecDeque<Instant>,
    /// Start of the current fixed window and the grants counted in it.
    window_start: Option<Instant>,
    window_count: u32,
}

/// Call-rate limiter shared by every worker of a run.
///
/// One instance is constructed per run and handed to the API wrapper; the
/// state is behind a mutex so the cap holds across all workers.
pub struct RateLimiter {
    cfg: RateLimiterConfig,
    state: Mutex<State>,
}

impl RateLimiter {
    pub fn new(cfg: RateLimiterConfig) -> Self {
        Self {
            cfg,
            state: Mutex::new(State {
                grants: VecDeque::new(),
                window_start: None,
                window_count: 0,
            }),
        }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.cfg
    }

    fn prune_locked(cfg: &RateLimiterConfig, st: &mut State, now: Instant) {
        while let Some(&oldest) = st.grants.front() {
            if now.duration_since(oldest) >= cfg.period {
                st.grants.pop_front();
            } else {
                break;
            }
        }
    }

    /// Grants one call or returns how long until one would be granted.
    fn try_grant_locked(cfg: &RateLimiterConfig, st: &mut State) -> std::result::Result<(), Duration> {
        if cfg.is_unlimited() {
            return Ok(());
        }
        let now = Instant::now();
        match cfg.window {
            WindowKind::Sliding => {
                Self::prune_locked(cfg, st, now);
                if st.grants.len() < cfg.calls as usize {
                    st.grants.push_back(now);
                    Ok(())
                } else {
                    // Full window: wait for the oldest grant to age out.
                    let oldest = st.grants.front().copied().unwrap_or(now);
                    Err((oldest + cfg.period).saturating_duration_since(now))
                }
            }
            WindowKind::Fixed => {
                let start = match st.window_start {
                    Some(s) if now.duration_since(s) < cfg.period => s,
                    _ => {
                        st.window_start = Some(now);
                        st.window_count = 0;
                        now
                    }
                };
                if st.window_count < cfg.calls {
                    st.window_count += 1;
                    Ok(())
                } else {
                    Err((start + cfg.period).saturating_duration_since(now))
                }
            }
        }
    }

    /// Try to take a call slot without waiting.
    ///
    /// A denial is reported as [`Error::RateLimited`], which the retrier treats as transient.
    pub async fn try_acquire(&self) -> Result<()> {
        let mut st = self.state.lock().await;
        Self::try_grant_locked(&self.cfg, &mut st).map_err(|wait| Error::RateLimited {
            retry_after_ms: wait.as_millis() as u64,
        })
    }

    /// Acquire one call slot (may sleep).
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut st = self.state.lock().await;
                match Self::try_grant_locked(&self.cfg, &mut st) {
                    Ok(()) => return,
                    Err(wait) => wait,
                }
            };
            tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
        }
    }

    pub async fn snapshot(&self) -> RateLimiterSnapshot {
        let cfg = &self.cfg;
        let mut st = self.state.lock().await;
        let now = Instant::now();

        let (in_window, wait) = match cfg.window {
            WindowKind::Sliding => {
                Self::prune_locked(cfg, &mut st, now);
                let wait = if !cfg.is_unlimited() && st.grants.len() >= cfg.calls as usize {
                    st.grants
                        .front()
                        .map(|oldest| (*oldest + cfg.period).saturating_duration_since(now))
                } else {
                    None
                };
                (st.grants.len(), wait)
            }
            WindowKind::Fixed => match st.window_start {
                Some(s) if now.duration_since(s) < cfg.period => {
                    let wait = (!cfg.is_unlimited() && st.window_count >= cfg.calls)
                        .then(|| (s + cfg.period).saturating_duration_since(now));
                    (st.window_count as usize, wait)
                }
                _ => (0, None),
            },
        };

        RateLimiterSnapshot {
            calls: cfg.calls,
            period: cfg.period,
            in_window,
            estimated_wait_ms: wait.map(|w| w.as_millis() as u64),
        }
    }
}
