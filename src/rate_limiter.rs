use reqwest::Method;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use crate::errors::FacebookError;

/// Weight class of a pending Graph API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiCallCost {
    /// Reads cost one point.
    Read,
    /// Creates, updates and deletes cost three points.
    Write,
}

impl ApiCallCost {
    pub fn weight(self) -> u32 {
        match self {
            ApiCallCost::Read => 1,
            ApiCallCost::Write => 3,
        }
    }

    pub fn for_method(method: &Method) -> Self {
        if *method == Method::GET {
            ApiCallCost::Read
        } else {
            ApiCallCost::Write
        }
    }
}

/// Point-in-time view of the local rate-limit budget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateBudget {
    pub points_used: u32,
    pub points_capacity: u32,
    pub window_duration_seconds: u64,
    pub window_elapsed_seconds: u64,
}

/// Admission ticket returned by [`RateLimiter::reserve`].
///
/// Points are charged when the ticket is issued. Hand it back through
/// [`RateLimiter::refund`] when the call never reached the platform.
#[derive(Debug)]
#[must_use]
pub struct Reservation {
    cost: ApiCallCost,
    generation: u64,
}

impl Reservation {
    pub fn cost(&self) -> ApiCallCost {
        self.cost
    }
}

/// Reservation bound to its limiter that refunds itself when dropped.
///
/// Covers callers that abandon a request mid-flight. Call
/// [`PendingCall::commit`] once the platform has answered.
#[derive(Debug)]
pub struct PendingCall<'a> {
    limiter: &'a RateLimiter,
    reservation: Option<Reservation>,
}

impl PendingCall<'_> {
    /// Keeps the points charged.
    pub fn commit(mut self) {
        self.reservation.take();
    }

    /// Returns the points now.
    pub fn refund(mut self) {
        if let Some(reservation) = self.reservation.take() {
            self.limiter.refund(reservation);
        }
    }
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        if let Some(reservation) = self.reservation.take() {
            tracing::debug!("Call abandoned before completion, refunding its points");
            self.limiter.refund(reservation);
        }
    }
}

#[derive(Debug)]
struct WindowState {
    points_used: u32,
    window_start: Instant,
    // Bumped on every window reset so stale refunds are ignored.
    generation: u64,
}

impl WindowState {
    fn roll(&mut self, now: Instant, window: Duration) {
        if now.duration_since(self.window_start) >= window {
            self.points_used = 0;
            self.window_start = now;
            self.generation += 1;
        }
    }
}

/// Points budget over a fixed window, shared by every caller of one client.
///
/// Local accounting only: platform rate-limit headers are not consulted.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: u32,
    window: Duration,
    state: Mutex<WindowState>,
}

impl RateLimiter {
    /// Creates a limiter allowing `capacity` points per `window`.
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self {
            capacity,
            window,
            state: Mutex::new(WindowState {
                points_used: 0,
                window_start: Instant::now(),
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WindowState> {
        // Counters stay consistent even if a holder panicked.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Waits until `cost` fits in the budget, then charges it.
    ///
    /// The lock is only held while reading and updating counters; the wait for
    /// the window to roll over happens outside it and the check is repeated
    /// after waking.
    ///
    /// # Errors
    ///
    /// `ValidationError` when `cost` alone exceeds the configured capacity,
    /// since such a call could never be admitted.
    pub async fn reserve(&self, cost: ApiCallCost) -> Result<Reservation, FacebookError> {
        let weight = cost.weight();
        if weight > self.capacity {
            return Err(FacebookError::validation(format!(
                "rate limit misconfigured: call weight {} exceeds capacity of {} points",
                weight, self.capacity
            )));
        }

        loop {
            let wait = {
                let mut state = self.lock();
                let now = Instant::now();
                state.roll(now, self.window);

                if state.points_used + weight <= self.capacity {
                    state.points_used += weight;
                    tracing::debug!(
                        "Rate limit: {}/{} points used",
                        state.points_used,
                        self.capacity
                    );
                    return Ok(Reservation {
                        cost,
                        generation: state.generation,
                    });
                }

                self.window
                    .saturating_sub(now.duration_since(state.window_start))
            };

            tracing::warn!(
                "Rate limit would be exceeded, waiting {:.1} seconds",
                wait.as_secs_f64()
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Like [`RateLimiter::reserve`], but the points are refunded unless the
    /// returned [`PendingCall`] is committed.
    pub async fn admit(&self, cost: ApiCallCost) -> Result<PendingCall<'_>, FacebookError> {
        let reservation = self.reserve(cost).await?;
        Ok(PendingCall {
            limiter: self,
            reservation: Some(reservation),
        })
    }

    /// Returns the points of a call that never reached the platform.
    ///
    /// Ignored when the window has rolled over since the reservation.
    pub fn refund(&self, reservation: Reservation) {
        let mut state = self.lock();
        if state.generation == reservation.generation {
            state.points_used = state
                .points_used
                .saturating_sub(reservation.cost.weight());
            tracing::debug!(
                "Rate limit: refunded {} points ({}/{} used)",
                reservation.cost.weight(),
                state.points_used,
                self.capacity
            );
        }
    }

    /// Snapshot of the current budget, rolling the window first if it expired.
    pub fn usage(&self) -> RateBudget {
        let mut state = self.lock();
        let now = Instant::now();
        state.roll(now, self.window);
        RateBudget {
            points_used: state.points_used,
            points_capacity: self.capacity,
            window_duration_seconds: self.window.as_secs(),
            window_elapsed_seconds: now.duration_since(state.window_start).as_secs(),
        }
    }
}
