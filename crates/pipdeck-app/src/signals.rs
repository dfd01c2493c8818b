//! OS signal handling for run abort

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::message::Message;
use pipdeck_core::prelude::*;

/// Spawn a task that turns every interrupt into [`Message::RequestAbort`].
///
/// The task ends when the receiver is dropped; abort the handle once the run
/// is over to restore the default Ctrl-C behavior.
pub fn spawn_abort_handler(tx: mpsc::Sender<Message>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Err(e) = wait_for_interrupt().await {
                error!("Signal handler error: {}", e);
                return;
            }

            info!("Interrupt received, requesting abort");
            if tx.send(Message::RequestAbort).await.is_err() {
                return;
            }
        }
    })
}

/// Wait for a single interrupt
async fn wait_for_interrupt() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| Error::process(format!("Failed to create SIGINT handler: {}", e)))?;
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| Error::process(format!("Failed to create SIGTERM handler: {}", e)))?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
        }

        Ok(())
    }

    #[cfg(windows)]
    {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| Error::process(format!("Failed to listen for Ctrl+C: {}", e)))?;
        info!("Received Ctrl+C");
        Ok(())
    }
}
