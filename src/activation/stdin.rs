//! Line-oriented activation source
//!
//! Every line read counts as one activation, whatever it contains. This lets
//! an external blink detector drive the daemon through a pipe:
//!
//! ```sh
//! blink-detector | blinkspeak --activation stdin
//! ```

use super::{ActivationEvent, ActivationSource};
use crate::error::ActivationError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};

pub struct StdinSource {
    stop_signal: Option<oneshot::Sender<()>>,
}

impl StdinSource {
    pub fn new() -> Self {
        Self { stop_signal: None }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ActivationSource for StdinSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<ActivationEvent>, ActivationError> {
        let (tx, rx) = mpsc::channel(32);
        let (stop_tx, stop_rx) = oneshot::channel();
        self.stop_signal = Some(stop_tx);

        tokio::spawn(forward_lines(
            BufReader::new(tokio::io::stdin()),
            tx,
            stop_rx,
        ));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), ActivationError> {
        if let Some(stop) = self.stop_signal.take() {
            let _ = stop.send(());
        }
        Ok(())
    }
}

/// Send one event per line until EOF, stop, or the receiver goes away
async fn forward_lines<R>(
    reader: R,
    tx: mpsc::Sender<ActivationEvent>,
    mut stop_rx: oneshot::Receiver<()>,
) where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    loop {
        tokio::select! {
            _ = &mut stop_rx => {
                tracing::debug!("stdin listener stopping");
                return;
            }
            line = lines.next_line() => match line {
                Ok(Some(_)) => {
                    tracing::debug!("Activation line on stdin");
                    if tx.send(ActivationEvent::new("stdin")).await.is_err() {
                        return;
                    }
                }
                Ok(None) => {
                    tracing::info!("stdin closed, no further activations from it");
                    return;
                }
                Err(e) => {
                    tracing::warn!("Failed to read stdin: {}", e);
                    return;
                }
            },
        }
    }
}
