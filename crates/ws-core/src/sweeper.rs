use tracing::debug;

use crate::dispatch::MessageHandler;
use crate::manager::Manager;

/// Periodically reclaims pending-ack and pending-response entries that
/// never received a reply. Runs for the lifetime of the manager; exits
/// as soon as the manager's scope is cancelled.
pub(crate) async fn run<U, H>(manager: Manager<U, H>)
where
    U: Send + Sync + 'static,
    H: MessageHandler<U> + Send + Sync + 'static,
{
    let period = manager.config().ack_timeout / 2;
    let mut ticker = tokio::time::interval(period);
    // The first tick fires immediately; skip it so we don't sweep a table
    // that has had no chance to accumulate anything yet.
    ticker.tick().await;
    loop {
        tokio::select! {
            () = manager.scope().cancelled() => break,
            _ = ticker.tick() => {
                let (acks, responses) = manager.sweep_pending_tables();
                if acks > 0 || responses > 0 {
                    debug!(acks, responses, "swept stale pending entries");
                }
            }
        }
    }
}
