//! Graceful shutdown signalling, ported in spirit from the teacher's
//! `crates/autopilot/src/shutdown_controller.rs`: a `oneshot`-backed pair
//! that every binary's run loop polls at the top of each iteration.

pub struct ShutdownController {
    shutdown: tokio::sync::oneshot::Receiver<()>,
}

pub struct ShutdownSignal(tokio::sync::oneshot::Sender<()>);

impl ShutdownController {
    /// Creates a controller that fires when the process receives SIGINT or
    /// (on Unix) SIGTERM, driving the drain sequence of spec §5.
    pub fn new_shutdown_on_signal() -> Self {
        let (sender, receiver) = tokio::sync::oneshot::channel();
        tokio::spawn(Self::wait_for_signal(ShutdownSignal(sender)));
        Self { shutdown: receiver }
    }

    /// Creates a controller a test or embedding binary can trigger manually.
    pub fn new_manual_shutdown() -> (ShutdownSignal, Self) {
        let (sender, receiver) = tokio::sync::oneshot::channel();
        (ShutdownSignal(sender), Self { shutdown: receiver })
    }

    async fn wait_for_signal(shutdown: ShutdownSignal) {
        #[cfg(unix)]
        {
            use tokio::signal::{self, unix};
            let mut sigterm = unix::signal(unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
            tokio::select! {
                _ = signal::ctrl_c() => tracing::info!("received SIGINT"),
                _ = sigterm.recv() => tracing::info!("received SIGTERM"),
            }
        }
        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install CTRL+C handler");
            tracing::info!("received SIGINT");
        }

        shutdown.shutdown();
    }

    /// Non-blocking check for whether shutdown has been requested. Intended
    /// to be polled at the top of every run-loop iteration.
    pub fn should_shutdown(&mut self) -> bool {
        self.shutdown.try_recv().is_ok()
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new_shutdown_on_signal()
    }
}

impl ShutdownSignal {
    pub fn shutdown(self) {
        let _ = self.0.send(());
    }
}
