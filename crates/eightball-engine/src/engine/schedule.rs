/// A one-shot callback due after a delay, advanced by fixed ticks instead
/// of wall-clock sleeps so the loop keeps handling input while it waits.
#[derive(Debug, Clone)]
pub struct Scheduled<T> {
    pending: Option<(T, f32)>,
}

impl<T> Scheduled<T> {
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Arm the timer, replacing anything already pending.
    pub fn arm(&mut self, payload: T, delay_ms: u32) {
        self.pending = Some((payload, delay_ms as f32 / 1000.0));
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Advance by `dt` seconds. Returns the payload once it falls due.
    pub fn advance(&mut self, dt: f32) -> Option<T> {
        let (_, remaining) = self.pending.as_mut()?;
        *remaining -= dt;
        // Tolerate rounding from summing many fixed ticks
        if *remaining > 1e-6 {
            return None;
        }
        self.pending.take().map(|(payload, _)| payload)
    }
}

impl<T> Default for Scheduled<T> {
    fn default() -> Self {
        Self::new()
    }
}
