//! Press and stick command implementations.
//!
//! Input goes straight into the emulator when the controller block is
//! configured; otherwise the virtual controller events are logged.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rdram_core::{
    BridgeConfig, Button, ChannelRegistry, Error, InputInjector, InputPath, PlayerIndex,
    ShutdownSignal,
};
use tokio::task::JoinHandle;
use tracing::info;

use super::{attach, install_shutdown};

struct Session {
    injector: InputInjector,
    shutdown: Arc<ShutdownSignal>,
    events: JoinHandle<()>,
}

impl Session {
    fn start(config: &BridgeConfig, pid: Option<u32>) -> Result<Self> {
        let memory = attach(config, pid)?;
        let shutdown = install_shutdown()?;

        let (registry, mut rx) = ChannelRegistry::new();
        let injector = InputInjector::new(Arc::new(registry));
        if injector.attach_direct(memory, &config.input) == InputPath::Virtual {
            println!("No controller block found; logging virtual controller events instead");
        }

        let events = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                info!("Virtual controller: {:?}", event);
            }
        });

        Ok(Self {
            injector,
            shutdown,
            events,
        })
    }

    /// Neutralize every controller and wait for pending events to be logged.
    async fn finish(self, result: rdram_core::Result<()>) -> Result<()> {
        self.injector.disconnect();
        drop(self.injector);
        self.events.await?;

        match result {
            Err(Error::Cancelled) => {
                println!("Cancelled");
                Ok(())
            }
            other => Ok(other?),
        }
    }
}

/// Hold one or more buttons together
pub async fn press(
    config: &BridgeConfig,
    pid: Option<u32>,
    player: usize,
    buttons: &[Button],
    duration: Duration,
) -> Result<()> {
    let player = PlayerIndex::new(player)?;
    let session = Session::start(config, pid)?;

    let result = session
        .injector
        .press_buttons(player, buttons, duration, &session.shutdown)
        .await;
    if result.is_ok() {
        println!("Held {:?} on {} for {:?}", buttons, player, duration);
    }
    session.finish(result).await
}

/// Glide the stick to (x, y), hold it there, then recenter
pub async fn stick(
    config: &BridgeConfig,
    pid: Option<u32>,
    player: usize,
    (x, y): (i8, i8),
    steps: u32,
    duration: Duration,
) -> Result<()> {
    let player = PlayerIndex::new(player)?;
    let session = Session::start(config, pid)?;

    let injector = &session.injector;
    let mut result = injector
        .move_stick_smooth(player, x, y, steps, duration / 2, &session.shutdown)
        .await;
    if result.is_ok() && session.shutdown.wait(duration / 2).await {
        result = Err(Error::Cancelled);
    }
    if result.is_ok() {
        println!("Moved {} stick to ({}, {})", player, x, y);
    }
    session.finish(result).await
}
