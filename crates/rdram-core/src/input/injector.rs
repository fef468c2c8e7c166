use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::input::{
    Axis, Button, ControllerBlock, ControllerState, DirectInputConfig, DirectPad, PlayerIndex,
    VirtualControllerRegistry, normalize_axis,
};
use crate::memory::ProcessMemory;
use crate::memory::layout::timing;
use crate::shutdown::ShutdownSignal;

/// Which path input is currently delivered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum InputPath {
    Direct,
    Virtual,
}

/// A change to deliver through the virtual registry.
enum Change {
    Button(Button, bool),
    Stick,
    Neutral,
}

/// Owns the four controller states and pushes every change out.
///
/// Primitives apply immediately and never wait. Compound actions are async
/// and only suspend the calling task.
pub struct InputInjector {
    players: [Mutex<ControllerState>; 4],
    registry: Arc<dyn VirtualControllerRegistry>,
    direct: RwLock<Option<DirectPad>>,
}

impl InputInjector {
    pub fn new(registry: Arc<dyn VirtualControllerRegistry>) -> Self {
        Self {
            players: Default::default(),
            registry,
            direct: RwLock::new(None),
        }
    }

    /// Switch to direct writes if the controller block can be resolved.
    ///
    /// Stays on (or returns to) the virtual path otherwise.
    pub fn attach_direct(&self, memory: Arc<ProcessMemory>, config: &DirectInputConfig) -> InputPath {
        let pad = if config.enabled {
            match ControllerBlock::resolve(memory.as_ref(), config) {
                Ok(block) => Some(DirectPad::new(memory, block)),
                Err(e) => {
                    warn!("Direct input unavailable, using virtual controller: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let path = if pad.is_some() {
            InputPath::Direct
        } else {
            InputPath::Virtual
        };
        *self.direct.write().unwrap_or_else(|e| e.into_inner()) = pad;
        info!("Input path: {}", path);
        path
    }

    pub fn detach_direct(&self) {
        self.direct.write().unwrap_or_else(|e| e.into_inner()).take();
    }

    pub fn path(&self) -> InputPath {
        if self.direct.read().unwrap_or_else(|e| e.into_inner()).is_some() {
            InputPath::Direct
        } else {
            InputPath::Virtual
        }
    }

    fn player(&self, player: PlayerIndex) -> MutexGuard<'_, ControllerState> {
        self.players[player.get()]
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self, player: PlayerIndex) -> ControllerState {
        *self.player(player)
    }

    pub fn press_button(&self, player: PlayerIndex, button: Button) {
        let mut state = self.player(player);
        state.press(button);
        self.deliver(player, &state, Change::Button(button, true));
    }

    pub fn release_button(&self, player: PlayerIndex, button: Button) {
        let mut state = self.player(player);
        state.release(button);
        self.deliver(player, &state, Change::Button(button, false));
    }

    pub fn set_analog_stick(&self, player: PlayerIndex, x: i8, y: i8) {
        let mut state = self.player(player);
        state.set_stick(x, y);
        self.deliver(player, &state, Change::Stick);
    }

    /// Return `player` to neutral: every button released, stick centered.
    pub fn release_all_buttons(&self, player: PlayerIndex) {
        let mut state = self.player(player);
        *state = ControllerState::neutral();
        self.deliver(player, &state, Change::Neutral);
    }

    /// Neutralize every player and drop the direct path.
    pub fn disconnect(&self) {
        for player in PlayerIndex::all() {
            self.release_all_buttons(player);
        }
        self.detach_direct();
    }

    /// Called with the player's state locked, so deliveries stay ordered.
    fn deliver(&self, player: PlayerIndex, state: &ControllerState, change: Change) {
        if let Some(pad) = self
            .direct
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            match pad.write(player, state) {
                Ok(()) => return,
                Err(e) => {
                    warn!(
                        "Direct write for {} failed, using virtual controller: {}",
                        player, e
                    );
                    // Earlier changes only reached memory.
                    self.announce(player, state);
                    return;
                }
            }
        }

        match change {
            Change::Button(button, pressed) => self.registry.button_event(player, button, pressed),
            Change::Stick => self.send_stick(player, state),
            Change::Neutral => self.announce(player, state),
        }
    }

    /// Send every button and both axes of `state` to the registry.
    fn announce(&self, player: PlayerIndex, state: &ControllerState) {
        for button in Button::iter() {
            self.registry
                .button_event(player, button, state.is_pressed(button));
        }
        self.send_stick(player, state);
    }

    fn send_stick(&self, player: PlayerIndex, state: &ControllerState) {
        self.registry
            .axis_event(player, Axis::X, normalize_axis(state.stick_x));
        self.registry
            .axis_event(player, Axis::Y, normalize_axis(state.stick_y));
    }

    /// Hold `button` for `duration`. The button is released even when
    /// `shutdown` cuts the hold short, which returns [`Error::Cancelled`].
    pub async fn hold_button(
        &self,
        player: PlayerIndex,
        button: Button,
        duration: Duration,
        shutdown: &ShutdownSignal,
    ) -> Result<()> {
        self.press_buttons(player, &[button], duration, shutdown)
            .await
    }

    /// Press `buttons` together, hold them, then release them together.
    pub async fn press_buttons(
        &self,
        player: PlayerIndex,
        buttons: &[Button],
        duration: Duration,
        shutdown: &ShutdownSignal,
    ) -> Result<()> {
        if shutdown.is_shutdown() {
            return Err(Error::Cancelled);
        }
        for &button in buttons {
            self.press_button(player, button);
        }

        let cancelled = shutdown.wait(duration).await;

        for &button in buttons {
            self.release_button(player, button);
        }
        if cancelled {
            debug!("Hold of {:?} for {} cancelled", buttons, player);
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    pub async fn tap_button(
        &self,
        player: PlayerIndex,
        button: Button,
        shutdown: &ShutdownSignal,
    ) -> Result<()> {
        self.hold_button(
            player,
            button,
            Duration::from_millis(timing::TAP_DURATION_MS),
            shutdown,
        )
        .await
    }

    /// Move the stick from its current position to `(x, y)` in `steps`
    /// evenly spaced increments spread over `duration`.
    ///
    /// On cancellation the stick stays where it got to.
    pub async fn move_stick_smooth(
        &self,
        player: PlayerIndex,
        x: i8,
        y: i8,
        steps: u32,
        duration: Duration,
        shutdown: &ShutdownSignal,
    ) -> Result<()> {
        let steps = steps.max(1);
        let start = self.state(player);
        let interval = duration / steps;
        let lerp = |from: i8, to: i8, step: u32| -> i8 {
            let from = from as i32;
            let delta = to as i32 - from;
            (from + delta * step as i32 / steps as i32) as i8
        };

        for step in 1..=steps {
            if shutdown.is_shutdown() {
                return Err(Error::Cancelled);
            }
            self.set_analog_stick(
                player,
                lerp(start.stick_x, x, step),
                lerp(start.stick_y, y, step),
            );
            if step < steps && shutdown.wait(interval).await {
                return Err(Error::Cancelled);
            }
        }
        Ok(())
    }
}
