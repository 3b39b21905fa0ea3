//! Keystroke driven tuning.
//!
//! Each key either moves the frequency by a fixed step, toggles PTT, or leaves the
//! loop. After every key the frequency is written to the device and rendered again.
use std::{error::Error, fmt::Display, io};

use crate::{
    Si570Device,
    dispatch::{DispatchError, Dispatcher},
};

pub const EXIT_KEY: char = 'x';
pub const PTT_KEY: char = 'p';

/// Up/down key pairs and their step in Hz.
pub const STEP_KEYS: &[(char, char, i32)] = &[
    ('q', 'a', 100_000),
    ('w', 's', 10_000),
    ('e', 'd', 1_000),
    ('r', 'f', 100),
    ('t', 'g', 10),
];

/// What a key press does.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Action {
    /// Move the frequency by this many Hz. Unknown keys step by zero.
    Step(i32),
    TogglePtt,
    Exit,
}

impl Action {
    pub fn for_key(key: char) -> Action {
        match key {
            EXIT_KEY => Action::Exit,
            PTT_KEY => Action::TogglePtt,
            key => STEP_KEYS
                .iter()
                .find_map(|&(up, down, hz)| {
                    if key == up {
                        Some(hz)
                    } else if key == down {
                        Some(-hz)
                    } else {
                        None
                    }
                })
                .map_or(Action::Step(0), Action::Step),
        }
    }
}

/// State of an interactive session. The frequency is in user units (MHz).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TuningSession {
    frequency: f64,
    ptt: bool,
}

impl TuningSession {
    pub fn new(frequency: f64, ptt: bool) -> TuningSession {
        TuningSession { frequency, ptt }
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn ptt(&self) -> bool {
        self.ptt
    }

    /// Apply an action. Returns `false` once the session should end.
    pub fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::Step(hz) => self.frequency += hz as f64 / 1_000_000.0,
            Action::TogglePtt => self.ptt = !self.ptt,
            Action::Exit => return false,
        }
        true
    }
}

/// Terminal side of the tuning loop.
pub trait TuningFrontend {
    /// Block until the next key. `None` ends the session like the exit key.
    fn next_key(&mut self) -> io::Result<Option<char>>;

    fn render(&mut self, session: &TuningSession) -> io::Result<()>;
}

#[derive(Debug)]
pub enum TuningError {
    /// The initial frequency could not be read
    Read(DispatchError),
    IoError(io::Error),
}

impl From<io::Error> for TuningError {
    fn from(value: io::Error) -> Self {
        TuningError::IoError(value)
    }
}

impl From<DispatchError> for TuningError {
    fn from(value: DispatchError) -> Self {
        TuningError::Read(value)
    }
}

impl Display for TuningError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TuningError::Read(error) => write!(f, "Cannot start tuning: {}", error),
            TuningError::IoError(error) => write!(f, "{}", error),
        }
    }
}

impl Error for TuningError {}

/// Run the tuning loop until the exit key is pressed.
///
/// Failed frequency writes are logged and otherwise ignored, the display shows the
/// requested frequency regardless. PTT only toggles once the device accepted the switch,
/// so the display and the dispatcher's cached state agree.
pub fn run_tuning<D: Si570Device>(
    dispatcher: &mut Dispatcher<D>,
    frontend: &mut impl TuningFrontend,
) -> Result<(), TuningError> {
    let frequency = dispatcher.read_frequency()?;
    let mut session = TuningSession::new(frequency, dispatcher.state().ptt);
    frontend.render(&session)?;

    while let Some(key) = frontend.next_key()? {
        let action = Action::for_key(key);
        log::trace!("Key {:?}: {:?}", key, action);
        if action == Action::TogglePtt
            && let Err(e) = dispatcher.set_ptt(!session.ptt())
        {
            log::warn!("Failed to switch PTT: {}", e);
        } else if !session.apply(action) {
            break;
        }
        if let Err(e) = dispatcher.write_frequency(session.frequency()) {
            log::warn!(
                "Failed to set frequency {:.6}: {}",
                session.frequency(),
                e
            );
        }
        frontend.render(&session)?;
    }
    log::debug!("Leaving tuning at {:.6} MHz", session.frequency());
    Ok(())
}
