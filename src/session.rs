//! The interactive session: user input and clock ticks are funnelled
//! through one channel and handled one at a time on the calling thread.

use anyhow::{anyhow, bail, Context, Result};
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration as STDDuration, Instant};
use tracing::{debug, info, warn};

use crate::countdown::{on_tick, Clock, TickOutcome};
use crate::interface::{self, Submission};
use crate::model::CycleStore;
use crate::validation::NewCycleForm;

/// Something the session has to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Input(String),
    Tick,
    /// No more input will come.
    Closed,
}

/// A command typed in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Start { minutes: String, task: String },
    Interrupt,
    Status,
    History,
    Help,
    Quit,
}

/// Parse one input line. Blank lines give `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<SessionCommand>, String> {
    let line = line.trim();
    let (word, rest) = match line.find(char::is_whitespace) {
        Some(index) => (&line[..index], line[index..].trim_start()),
        None => (line, ""),
    };

    let command = match word {
        "" => return Ok(None),
        "start" => {
            let (minutes, task) = match rest.find(char::is_whitespace) {
                Some(index) => (&rest[..index], rest[index..].trim_start()),
                None => (rest, ""),
            };
            SessionCommand::Start {
                minutes: minutes.to_string(),
                task: task.to_string(),
            }
        }
        "interrupt" | "stop" => SessionCommand::Interrupt,
        "status" => SessionCommand::Status,
        "history" => SessionCommand::History,
        "help" | "?" => SessionCommand::Help,
        "quit" | "exit" => SessionCommand::Quit,
        other => return Err(format!("Unknown command '{}'. Type 'help' for the list.", other)),
    };
    Ok(Some(command))
}

/// Whether the session goes on after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// How the session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Runs until the user quits.
    Interactive,
    /// Runs a single cycle in the foreground and ends with it.
    Single,
}

pub struct Session<C: Clock, W: Write> {
    store: CycleStore,
    form: NewCycleForm,
    clock: C,
    out: W,
    mode: Mode,
}

impl<C: Clock, W: Write> Session<C, W> {
    pub fn new(clock: C, out: W, mode: Mode) -> Self {
        Self {
            store: CycleStore::new(),
            form: NewCycleForm::default(),
            clock,
            out,
            mode,
        }
    }

    pub fn store(&self) -> &CycleStore {
        &self.store
    }

    #[cfg(test)]
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Fill the form with the given values and submit it.
    pub fn submit(&mut self, task: &str, minutes: &str) -> Result<Submission> {
        self.form = NewCycleForm::new(task, minutes);

        let now = self.clock.now();
        let submission = interface::submit(&mut self.store, &mut self.form, now);
        interface::report_submission(&mut self.out, &self.store, &submission)?;
        Ok(submission)
    }

    /// Start the one cycle of a `Single` session. Invalid input is an
    /// error, there is no form to correct it in. The reason is already
    /// printed next to the fields, the error only tells nothing started.
    pub fn start_single(&mut self, task: &str, minutes: &str) -> Result<()> {
        match self.submit(task, minutes)? {
            Submission::Started(_) => {
                self.redraw()?;
                Ok(())
            }
            Submission::Invalid(_) | Submission::Disabled | Submission::Busy => {
                Err(anyhow!("The cycle was not started."))
            }
        }
    }

    /// Wait for events until the session ends. Ticks are produced every
    /// `tick` whatever the input rate. Ticks missed while the process was
    /// stalled are dropped, not replayed.
    pub fn run(&mut self, events: &Receiver<Event>, tick: STDDuration) -> Result<()> {
        if tick.is_zero() {
            bail!("Tick interval must not be zero.");
        }
        let mut next_tick = next_tick_after(Instant::now(), tick)?;
        loop {
            let timeout = next_tick.saturating_duration_since(Instant::now());
            let event = match events.recv_timeout(timeout) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => {
                    next_tick = schedule_next_tick(next_tick, Instant::now(), tick)?;
                    Event::Tick
                }
                Err(RecvTimeoutError::Disconnected) => Event::Closed,
            };
            if self.handle(event)? == Flow::Quit {
                return Ok(());
            }
        }
    }

    pub fn handle(&mut self, event: Event) -> Result<Flow> {
        debug!(?event, "handling event");
        let flow = match event {
            Event::Tick => self.on_tick()?,
            Event::Input(line) => match parse_command(&line) {
                Ok(Some(command)) => self.dispatch(command)?,
                Ok(None) => Flow::Continue,
                Err(message) => {
                    writeln!(self.out, "{}", message)?;
                    Flow::Continue
                }
            },
            Event::Closed => self.quit()?,
        };

        if flow == Flow::Continue && self.mode == Mode::Single && self.store.running_cycle().is_none() {
            writeln!(self.out)?;
            interface::history(&mut self.out, &self.store)?;
            return Ok(Flow::Quit);
        }
        self.out.flush().context("Failed to flush output.")?;
        Ok(flow)
    }

    fn dispatch(&mut self, command: SessionCommand) -> Result<Flow> {
        match command {
            SessionCommand::Start { minutes, task } => {
                self.submit(&task, &minutes)?;
            }
            SessionCommand::Interrupt => {
                let now = self.clock.now();
                let running = self.store.running_cycle().map(|cycle| cycle.task.clone());
                match (interface::interrupt(&mut self.store, now), running) {
                    (Some(_), Some(task)) => writeln!(self.out, "Interrupted '{}'.", task)?,
                    _ => writeln!(self.out, "No cycle is running.")?,
                }
            }
            SessionCommand::Status => writeln!(self.out, "{}", interface::status_line(&self.store))?,
            SessionCommand::History => interface::history(&mut self.out, &self.store)?,
            SessionCommand::Help => self.help()?,
            SessionCommand::Quit => return self.quit(),
        }
        Ok(Flow::Continue)
    }

    fn on_tick(&mut self) -> Result<Flow> {
        let now = self.clock.now();
        match on_tick(&mut self.store, now) {
            TickOutcome::Finished => {
                let task = self
                    .store
                    .active_cycle()
                    .map(|cycle| cycle.task.clone())
                    .unwrap_or_default();
                self.redraw()?;
                // \x07 rings the terminal bell
                writeln!(self.out, "\x07\nCycle '{}' finished!", task)?;
            }
            TickOutcome::Counting(_) => self.redraw()?,
            TickOutcome::Idle => {}
        }
        Ok(Flow::Continue)
    }

    // only the foreground countdown redraws its line, the interactive
    // session would garble what the user is typing
    fn redraw(&mut self) -> Result<()> {
        if self.mode == Mode::Single {
            write!(self.out, "\r{}", interface::status_line(&self.store))?;
        }
        Ok(())
    }

    fn quit(&mut self) -> Result<Flow> {
        if self.store.running_cycle().is_some() {
            info!("leaving with a running cycle, interrupting it");
            let now = self.clock.now();
            interface::interrupt(&mut self.store, now);
            if self.mode == Mode::Single {
                writeln!(self.out)?;
                interface::history(&mut self.out, &self.store)?;
            }
        }
        self.out.flush().context("Failed to flush output.")?;
        Ok(Flow::Quit)
    }

    fn help(&mut self) -> Result<()> {
        if self.store.running_cycle().is_some() {
            writeln!(self.out, "  interrupt                 stop the running cycle")?;
        } else {
            writeln!(self.out, "  start <minutes> <task>    start a cycle of 1 to 60 minutes")?;
        }
        writeln!(self.out, "  status                    show the countdown")?;
        writeln!(self.out, "  history                   list the cycles of this session")?;
        writeln!(self.out, "  quit                      leave")?;
        Ok(())
    }
}

fn next_tick_after(from: Instant, tick: STDDuration) -> Result<Instant> {
    from.checked_add(tick)
        .ok_or_else(|| anyhow!("Tick interval {:?} is too long.", tick))
}

/// The deadline of the tick after the one due at `due`. When the loop
/// fell behind by more than an interval the missed ticks are dropped.
fn schedule_next_tick(due: Instant, now: Instant, tick: STDDuration) -> Result<Instant> {
    let next = next_tick_after(due, tick)?;
    if next <= now {
        debug!("ticks fell behind, skipping to the next one");
        return next_tick_after(now, tick);
    }
    Ok(next)
}

/// Forward stdin lines to `events`, then `Event::Closed` once stdin ends.
/// The thread never touches the session state.
pub fn spawn_stdin_reader(events: Sender<Event>) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if events.send(Event::Input(line)).is_err() {
                            return;
                        }
                    }
                    Err(error) => {
                        warn!(%error, "failed to read stdin");
                        break;
                    }
                }
            }
            let _ = events.send(Event::Closed);
        })
        .context("Failed to spawn the stdin reader.")
}
