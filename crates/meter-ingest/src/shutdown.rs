use tokio::sync::watch;

/// Sending half of the stop signal.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn stop(&self) {
        // send_replace succeeds even with no receiver left
        self.tx.send_replace(true);
    }
}

/// Receiving half of the stop signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl Shutdown {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_trigger, shutdown) = shutdown_channel();
        shutdown
    }

    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once stop has been requested. Pends forever if the trigger is dropped first.
    pub async fn stopped(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_stop_is_observed_by_clones() {
        let (trigger, shutdown) = shutdown_channel();
        let mut clone = shutdown.clone();
        assert!(!shutdown.is_stopped());
        trigger.stop();
        assert!(shutdown.is_stopped());
        tokio::time::timeout(Duration::from_secs(1), clone.stopped())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_does_not_fire() {
        let mut never = Shutdown::never();
        assert!(!never.is_stopped());
        let waited = tokio::time::timeout(Duration::from_secs(5), never.stopped()).await;
        assert!(waited.is_err());
    }
}
