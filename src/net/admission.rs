//! Admission control for the accept loop.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts serviced clients and signals the listener to stop accepting once
/// the configured maximum is reached.
///
/// Relaxed ordering is sufficient: the counter only needs monotonicity, not
/// synchronization with other state.
#[derive(Debug)]
pub struct AdmissionStatus {
    max_clients: usize,
    serviced: AtomicUsize,
}

impl AdmissionStatus {
    /// `max_clients` of zero means unlimited.
    pub fn new(max_clients: usize) -> Self {
        Self {
            max_clients,
            serviced: AtomicUsize::new(0),
        }
    }

    /// True once the configured maximum has been serviced.
    pub fn should_stop(&self) -> bool {
        self.max_clients != 0 && self.clients_serviced() >= self.max_clients
    }

    /// Record one accepted and handed-off client.
    pub fn client_serviced(&self) {
        self.serviced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn clients_serviced(&self) -> usize {
        self.serviced.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_never_stops() {
        let status = AdmissionStatus::new(0);
        for _ in 0..100 {
            status.client_serviced();
        }
        assert!(!status.should_stop());
    }

    #[test]
    fn stops_at_limit() {
        let status = AdmissionStatus::new(2);
        assert!(!status.should_stop());

        status.client_serviced();
        assert!(!status.should_stop());

        status.client_serviced();
        assert!(status.should_stop());
        assert_eq!(status.clients_serviced(), 2);
    }
}
