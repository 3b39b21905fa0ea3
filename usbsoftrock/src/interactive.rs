//! Terminal frontend for the `interactive` command.
use std::io::{self, Stdout, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Attribute, Print, SetAttribute},
    terminal::{
        Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
        enable_raw_mode,
    },
};
use softrock_server::tuning::{TuningFrontend, TuningSession};

const LEGEND: &[&str] = &[
    "q/a = Up/Down 100 KHz",
    "w/s = Up/Down  10 KHz",
    "e/d = Up/Down   1 KHz",
    "r/f = Up/Down 100 Hz",
    "t/g = Up/Down  10 Hz",
    "p   = Toggle PTT",
    "x   = Exit",
];

const FREQUENCY_ROW: u16 = 1;
const LEGEND_ROW: u16 = 3;

/// Raw mode terminal on an alternate screen. Restored when dropped.
pub struct TerminalFrontend {
    stdout: Stdout,
}

impl TerminalFrontend {
    pub fn new() -> io::Result<TerminalFrontend> {
        enable_raw_mode()?;
        let mut frontend = TerminalFrontend {
            stdout: io::stdout(),
        };
        execute!(frontend.stdout, EnterAlternateScreen, Hide)?;
        for (row, line) in (LEGEND_ROW..).zip(LEGEND) {
            queue!(frontend.stdout, MoveTo(0, row), Print(line))?;
        }
        frontend.stdout.flush()?;
        Ok(frontend)
    }
}

impl Drop for TerminalFrontend {
    fn drop(&mut self) {
        if let Err(e) = execute!(self.stdout, Show, LeaveAlternateScreen) {
            log::warn!("Failed to leave the alternate screen: {}", e);
        }
        if let Err(e) = disable_raw_mode() {
            log::warn!("Failed to restore the terminal: {}", e);
        }
    }
}

impl TuningFrontend for TerminalFrontend {
    fn next_key(&mut self) -> io::Result<Option<char>> {
        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                // Raw mode swallows SIGINT
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(None);
                }
                KeyCode::Char(c) => return Ok(Some(c)),
                KeyCode::Esc => return Ok(None),
                _ => continue,
            }
        }
    }

    fn render(&mut self, session: &TuningSession) -> io::Result<()> {
        queue!(
            self.stdout,
            MoveTo(0, FREQUENCY_ROW),
            Clear(ClearType::CurrentLine),
            SetAttribute(Attribute::Bold),
            Print(format!("{:.6} MHz", session.frequency())),
            SetAttribute(Attribute::Reset),
        )?;
        if session.ptt() {
            queue!(self.stdout, Print("  PTT"))?;
        }
        self.stdout.flush()
    }
}
