use super::context::TIME_EPSILON_SECONDS;

/// Predicate a continuation keeps waiting on while it returns `true`.
pub type WaitWhile<S> = Box<dyn Fn(&S) -> bool>;

struct Continuation<K, S> {
    key: K,
    wait_while: Option<WaitWhile<S>>,
    remaining_seconds: f32,
}

/// Deferred steps of the form "wait while P holds, then wait D seconds".
///
/// The predicate is evaluated against caller-supplied state on every advance
/// until it first clears; after that only the delay counts down. Continuations
/// cannot be cancelled individually, only dropped all together.
pub struct Scheduler<K, S> {
    pending: Vec<Continuation<K, S>>,
}

impl<K, S> Default for Scheduler<K, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, S> Scheduler<K, S> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    pub fn schedule(&mut self, key: K, wait_while: Option<WaitWhile<S>>, delay_seconds: f32) {
        self.pending.push(Continuation {
            key,
            wait_while,
            remaining_seconds: delay_seconds.max(0.0),
        });
    }

    /// Advances every continuation by `dt_seconds` and returns the keys that
    /// became due, in scheduling order.
    pub fn advance(&mut self, dt_seconds: f32, state: &S) -> Vec<K> {
        let mut due = Vec::new();
        let mut still_pending = Vec::with_capacity(self.pending.len());
        for mut continuation in self.pending.drain(..) {
            if let Some(wait_while) = &continuation.wait_while {
                if wait_while(state) {
                    still_pending.push(continuation);
                    continue;
                }
                continuation.wait_while = None;
            }
            continuation.remaining_seconds -= dt_seconds;
            if continuation.remaining_seconds <= TIME_EPSILON_SECONDS {
                due.push(continuation.key);
            } else {
                still_pending.push(continuation);
            }
        }
        self.pending = still_pending;
        due
    }

    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
