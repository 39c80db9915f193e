//! core/player.rs
//! The control thread: one `AudioEngine` + one `QueueManager`, driven by commands.
//!
//! UI/CLI code never touches the engine or the queue directly. It holds a
//! `PlayerController` and listens on the `PlayerEvent` receiver.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;

use tracing::{debug, error, info, warn};

use super::playback::{AudioEngine, AudioOutput, EngineConfig, PlaybackEvent, PlaybackState};
use super::queue::{QueueEvent, QueueManager};
use super::settings::Settings;
use super::types::TrackRecord;

#[derive(Clone)]
pub struct PlayerController {
    command_tx: Sender<PlayerCommand>,
}

impl PlayerController {
    #[cfg(test)]
    pub(crate) fn from_sender(command_tx: Sender<PlayerCommand>) -> Self {
        Self { command_tx }
    }

    /// Best-effort send. If the player thread died, the command is dropped.
    pub fn send(&self, cmd: PlayerCommand) {
        let _ = self.command_tx.send(cmd);
    }
}

#[derive(Debug, Clone)]
pub enum PlayerCommand {
    /// Play the queue's current track (the first one if nothing is current).
    PlayCurrent,
    PlayIndex(usize),
    Pause,
    Resume,
    TogglePlayPause,
    Stop,
    Next,
    Previous,
    Seek(f64), // seconds
    Enqueue(Vec<TrackRecord>),
    Insert(usize, TrackRecord),
    Remove(usize),
    Move { from: usize, to: usize },
    Clear,
    RemoveCurrent,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Playback(PlaybackEvent),
    Queue(QueueEvent),
}

/// Spawns the control thread and returns:
/// - PlayerController (send commands)
/// - Receiver<PlayerEvent> (everything the engine and queue report, in order)
///
/// The saved queue is restored from `settings` before the first command runs.
pub fn start_player(
    output: Arc<dyn AudioOutput>,
    settings: Arc<Settings>,
    config: EngineConfig,
) -> (PlayerController, Receiver<PlayerEvent>) {
    let (command_tx, command_rx) = mpsc::channel::<PlayerCommand>();
    let (event_tx, event_rx) = mpsc::channel::<PlayerEvent>();

    let spawned = thread::Builder::new()
        .name("peachy-player".to_string())
        .spawn(move || {
            let mut player = Player::new(output, settings, config, event_tx);
            player.run(command_rx);
        });

    if let Err(e) = spawned {
        // Controller stays usable; commands just go nowhere.
        error!("Failed to start player thread: {e}");
    }

    (PlayerController { command_tx }, event_rx)
}

struct Player {
    engine: AudioEngine,
    queue: QueueManager,
    tick: std::time::Duration,

    // The playing track was taken out of the queue; this is where it sat, so
    // "next" continues from there instead of from the top.
    vacated_slot: Option<usize>,

    playback_rx: Receiver<PlaybackEvent>,
    queue_rx: Receiver<QueueEvent>,
    event_tx: Sender<PlayerEvent>,
}

impl Player {
    fn new(
        output: Arc<dyn AudioOutput>,
        settings: Arc<Settings>,
        config: EngineConfig,
        event_tx: Sender<PlayerEvent>,
    ) -> Self {
        let (playback_tx, playback_rx) = mpsc::channel();
        let (queue_tx, queue_rx) = mpsc::channel();

        let tick = config.tick_interval;
        let engine = AudioEngine::with_config(output, playback_tx, config);

        let mut queue = QueueManager::new(queue_tx).with_settings(settings.clone());
        queue.restore(settings.queue(), settings.current_queue_index());

        Self {
            engine,
            queue,
            tick,
            vacated_slot: None,
            playback_rx,
            queue_rx,
            event_tx,
        }
    }

    fn run(&mut self, command_rx: Receiver<PlayerCommand>) {
        self.forward();

        loop {
            match command_rx.recv_timeout(self.tick) {
                Ok(cmd) => {
                    if self.handle_command(cmd) {
                        break;
                    }
                    while let Ok(cmd) = command_rx.try_recv() {
                        if self.handle_command(cmd) {
                            self.shutdown();
                            return;
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            self.engine.tick();
            self.forward();
        }

        self.shutdown();
    }

    fn shutdown(&mut self) {
        info!("Player shutting down");
        self.engine.stop();
        self.forward();
    }

    /// Returns true on shutdown.
    fn handle_command(&mut self, cmd: PlayerCommand) -> bool {
        debug!("Command: {cmd:?}");

        match cmd {
            PlayerCommand::PlayCurrent => {
                if self.queue.current_index().is_none() && !self.queue.is_empty() {
                    self.queue.set_current(Some(0));
                }
                self.vacated_slot = None;
                self.play_current();
            }
            PlayerCommand::PlayIndex(i) => {
                if self.queue.set_current(Some(i)) {
                    self.vacated_slot = None;
                    self.play_current();
                } else {
                    warn!("PlayIndex({i}) out of range (queue has {})", self.queue.len());
                }
            }
            PlayerCommand::Pause => {
                self.engine.pause();
            }
            PlayerCommand::Resume => {
                if self.engine.state() == PlaybackState::Idle {
                    self.handle_command(PlayerCommand::PlayCurrent);
                } else {
                    self.engine.resume();
                }
            }
            PlayerCommand::TogglePlayPause => {
                if self.engine.state() == PlaybackState::Idle {
                    self.handle_command(PlayerCommand::PlayCurrent);
                } else {
                    self.engine.toggle_play_pause();
                }
            }
            PlayerCommand::Stop => {
                self.engine.stop();
            }
            PlayerCommand::Next => self.advance(),
            PlayerCommand::Previous => self.step_back(),
            PlayerCommand::Seek(secs) => {
                if !self.engine.seek(secs) {
                    debug!("Seek to {secs:.2}s ignored");
                }
            }
            PlayerCommand::Enqueue(tracks) => self.queue.add_many(tracks),
            PlayerCommand::Insert(i, track) => {
                if self.queue.insert(i, track) {
                    // Inserting right into the gap makes the new track next.
                    if let Some(slot) = self.vacated_slot.filter(|&slot| i < slot) {
                        self.vacated_slot = Some(slot + 1);
                    }
                } else {
                    warn!("Insert at {i} out of range");
                }
            }
            PlayerCommand::Remove(i) => self.remove(i),
            PlayerCommand::Move { from, to } => {
                self.queue.move_track(from, to);
            }
            PlayerCommand::Clear => {
                self.vacated_slot = None;
                self.queue.clear();
            }
            PlayerCommand::RemoveCurrent => {
                let was_active = self.engine.state() != PlaybackState::Idle;
                if self.queue.remove_current().is_some() && was_active {
                    // Whatever slid into the slot takes over.
                    if self.queue.current().is_some() {
                        self.play_current();
                    } else {
                        self.engine.stop();
                    }
                }
            }
            PlayerCommand::Shutdown => return true,
        }

        self.forward();
        false
    }

    fn play_current(&mut self) {
        let Some(track) = self.queue.current().cloned() else {
            debug!("Nothing current to play");
            return;
        };
        // A failure is already reported as an Error event; no retry.
        self.engine.play(&track, 0.0);
    }

    fn remove(&mut self, index: usize) {
        let was_current = self.queue.current_index() == Some(index);
        if self.queue.remove(index).is_none() {
            return;
        }

        if was_current && self.engine.state() != PlaybackState::Idle {
            // Keeps playing; what follows is whatever slid into its slot.
            self.vacated_slot = Some(index);
        } else if let Some(slot) = self.vacated_slot.filter(|&slot| index < slot) {
            self.vacated_slot = Some(slot - 1);
        }
    }

    fn advance(&mut self) {
        if let Some(slot) = self.vacated_slot.take() {
            if self.queue.set_current(Some(slot)) {
                self.play_current();
            } else {
                info!("End of queue");
            }
            return;
        }

        let Some(track) = self.queue.next().cloned() else {
            info!("End of queue");
            return;
        };
        self.engine.play(&track, 0.0);
    }

    fn step_back(&mut self) {
        if self.engine.history().len() >= 2 {
            self.engine.play_previous();
            return;
        }

        if let Some(slot) = self.vacated_slot.take() {
            if let Some(before) = slot.checked_sub(1) {
                self.queue.set_current(Some(before));
                self.play_current();
            }
            return;
        }

        if let Some(track) = self.queue.previous().cloned() {
            self.engine.play(&track, 0.0);
        }
    }

    /// Pass engine + queue events outward; react to natural track ends.
    fn forward(&mut self) {
        loop {
            let mut moved = false;

            while let Ok(event) = self.queue_rx.try_recv() {
                moved = true;
                let _ = self.event_tx.send(PlayerEvent::Queue(event));
            }

            while let Ok(event) = self.playback_rx.try_recv() {
                moved = true;
                let finished = event == PlaybackEvent::Finished;
                let _ = self.event_tx.send(PlayerEvent::Playback(event));

                if finished {
                    self.advance();
                }
            }

            if !moved {
                break;
            }
        }
    }
}
