//! Bounded branch concurrency with front/back admission.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;

/// Where a waiter joins the queue when no slot is free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Served before every current waiter.
    Front,
    /// Served after every current waiter.
    Back,
}

#[derive(Debug)]
struct LimiterState {
    available: usize,
    waiters: VecDeque<oneshot::Sender<()>>,
}

/// Counting semaphore whose waiters can jump the queue.
///
/// Slots are not tied to the task that acquired them: any task may
/// [`release`](Self::release) one.
#[derive(Debug)]
pub struct BranchLimiter {
    state: Mutex<LimiterState>,
}

impl BranchLimiter {
    #[must_use]
    pub fn new(slots: usize) -> Self {
        Self {
            state: Mutex::new(LimiterState {
                available: slots,
                waiters: VecDeque::new(),
            }),
        }
    }

    /// Take a slot, waiting if none is free.
    pub async fn acquire(&self, admission: Admission) {
        let slot = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.available > 0 {
                state.available -= 1;
                return;
            }
            let (tx, rx) = oneshot::channel();
            match admission {
                Admission::Front => state.waiters.push_front(tx),
                Admission::Back => state.waiters.push_back(tx),
            }
            rx
        };
        // The sender only disappears with the limiter itself.
        let _ = slot.await;
    }

    /// Return a slot, handing it straight to the first live waiter.
    pub fn release(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(waiter) = state.waiters.pop_front() {
            if waiter.send(()).is_ok() {
                return;
            }
        }
        state.available += 1;
    }

    /// Free slots.
    pub fn available(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .available
    }

    /// Tasks blocked in [`acquire`](Self::acquire).
    pub fn waiting(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .waiters
            .iter()
            .filter(|waiter| !waiter.is_closed())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn free_slots_are_taken_immediately() {
        let limiter = BranchLimiter::new(2);
        limiter.acquire(Admission::Back).await;
        limiter.acquire(Admission::Front).await;
        assert_eq!(limiter.available(), 0);

        limiter.release();
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn front_waiters_are_served_first() {
        let limiter = Arc::new(BranchLimiter::new(0));
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut tasks = tokio::task::JoinSet::new();
        for (name, admission) in [
            ("back-1", Admission::Back),
            ("back-2", Admission::Back),
            ("front", Admission::Front),
        ] {
            let limiter = Arc::clone(&limiter);
            let order = Arc::clone(&order);
            tasks.spawn(async move {
                limiter.acquire(admission).await;
                order.lock().unwrap().push(name);
            });
            // Let each waiter enqueue before the next.
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(limiter.waiting(), 3);

        for _ in 0..3 {
            limiter.release();
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        while tasks.join_next().await.is_some() {}

        assert_eq!(*order.lock().unwrap(), vec!["front", "back-1", "back-2"]);
        assert_eq!(limiter.available(), 0);
    }

    #[tokio::test]
    async fn abandoned_waiters_are_skipped() {
        let limiter = BranchLimiter::new(0);
        {
            let pending = limiter.acquire(Admission::Back);
            tokio::pin!(pending);
            // Poll once so the waiter is queued, then drop it.
            assert!(still_pending(pending.as_mut()).await);
        }
        assert_eq!(limiter.waiting(), 0);

        limiter.release();
        assert_eq!(limiter.available(), 1);
    }

    /// Poll `fut` once; true if it is still pending.
    async fn still_pending<F: std::future::Future + Unpin>(fut: F) -> bool {
        tokio::select! {
            biased;
            _ = fut => false,
            () = std::future::ready(()) => true,
        }
    }
}
