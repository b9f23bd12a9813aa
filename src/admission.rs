use crate::models::Platform;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Per-platform admission gate. Each platform has its own FIFO semaphore, so
/// waiters are served in arrival order and a busy platform never holds up
/// calls against another one.
#[derive(Debug, Clone)]
pub struct PlatformGates {
    limit: usize,
    gates: Arc<HashMap<Platform, Arc<Semaphore>>>,
}

impl PlatformGates {
    /// `limit` concurrent collaborator calls per platform (at least 1).
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        let gates = Platform::ALL
            .iter()
            .map(|p| (*p, Arc::new(Semaphore::new(limit))))
            .collect();
        Self { limit, gates: Arc::new(gates) }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub async fn acquire(&self, platform: Platform) -> OwnedSemaphorePermit {
        let gate = self.gates[&platform].clone();
        // `gates` is private and nothing calls `close()` on it, so acquire cannot fail.
        match gate.acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => unreachable!("platform gate closed"),
        }
    }

    /// Permits currently free for `platform`.
    pub fn available(&self, platform: Platform) -> usize {
        self.gates[&platform].available_permits()
    }
}
