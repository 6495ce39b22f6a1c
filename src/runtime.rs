use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// Polling interval of the front-end loop
pub const TICK_RATE: Duration = Duration::from_millis(100);

/// Unified event type consumed by the app loop
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Production event source: a reader thread forwarding crossterm events
pub struct CrosstermEvents {
    rx: Receiver<AppEvent>,
}

impl CrosstermEvents {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                // key release/repeat reports would double count on some terminals
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                    tx.send(AppEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => tx.send(AppEvent::Resize),
                Ok(_) => Ok(()),
                Err(e) => {
                    log::warn!("terminal event reader stopped: {e}");
                    break;
                }
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEvents {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Event source fed by hand, for headless runs and tests
pub struct ChannelEvents {
    rx: Receiver<AppEvent>,
}

impl ChannelEvents {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for ChannelEvents {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Advances the application one event at a time. Ticks are emitted on a
/// fixed cadence even while input keeps arriving.
pub struct Runner<E: EventSource> {
    events: E,
    interval: Duration,
    last_tick: Instant,
}

impl<E: EventSource> Runner<E> {
    pub fn new(events: E, interval: Duration) -> Self {
        Self {
            events,
            interval,
            last_tick: Instant::now(),
        }
    }

    /// Blocks until the next event, or returns Tick when one is due.
    pub fn step(&mut self) -> AppEvent {
        let remaining = self.interval.saturating_sub(self.last_tick.elapsed());
        if remaining.is_zero() {
            self.last_tick = Instant::now();
            return AppEvent::Tick;
        }
        match self.events.recv_timeout(remaining) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => {
                self.last_tick = Instant::now();
                AppEvent::Tick
            }
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(remaining);
                self.last_tick = Instant::now();
                AppEvent::Tick
            }
        }
    }
}
