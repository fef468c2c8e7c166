//! Host-side virtual controller delivery.

use tokio::sync::mpsc;
use tracing::debug;

use crate::input::{Axis, Button, PlayerIndex};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Button {
        player: PlayerIndex,
        button: Button,
        pressed: bool,
    },
    Axis {
        player: PlayerIndex,
        axis: Axis,
        /// Normalized to `[-1.0, 1.0]`
        value: f32,
    },
}

/// Receiver of synthetic controller events, keyed by player and control.
pub trait VirtualControllerRegistry: Send + Sync {
    fn button_event(&self, player: PlayerIndex, button: Button, pressed: bool);

    fn axis_event(&self, player: PlayerIndex, axis: Axis, value: f32);
}

/// Forwards every event over an unbounded channel.
pub struct ChannelRegistry {
    tx: mpsc::UnboundedSender<InputEvent>,
}

impl ChannelRegistry {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<InputEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: InputEvent) {
        if self.tx.send(event).is_err() {
            debug!("Dropping {:?}: no receiver", event);
        }
    }
}

impl VirtualControllerRegistry for ChannelRegistry {
    fn button_event(&self, player: PlayerIndex, button: Button, pressed: bool) {
        self.send(InputEvent::Button {
            player,
            button,
            pressed,
        });
    }

    fn axis_event(&self, player: PlayerIndex, axis: Axis, value: f32) {
        self.send(InputEvent::Axis {
            player,
            axis,
            value,
        });
    }
}
