#[macro_use] extern crate prettytable;

use anyhow::Context;
use std::io::{self, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use structopt::StructOpt;

mod cli;
mod countdown;
mod interface;
mod logging;
mod model;
mod session;
mod validation;

use cli::{Command, CommandLineArgs};
use countdown::SystemClock;
use session::{Event, Mode, Session};
use std::time::Duration;
use tracing::info;

/// Feed stdin to the session and run it until it ends.
fn run<W: Write>(
    mut session: Session<SystemClock, W>,
    events: Sender<Event>,
    receiver: &Receiver<Event>,
    tick: Duration,
) -> anyhow::Result<()> {
    session::spawn_stdin_reader(events)?;
    session.run(receiver, tick)?;
    info!(cycles = session.store().cycles().len(), "session ended");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    logging::init();

    // Get the command-line arguments.
    let CommandLineArgs { action, tick } = CommandLineArgs::from_args();

    let stdout = io::stdout();
    let (events, receiver) = mpsc::channel();

    // Perform the action.
    match action.unwrap_or(Command::Session) {
        Command::Session => {
            let mut out = stdout.lock();
            writeln!(out, "Type 'help' for the list of commands.")?;
            let session = Session::new(SystemClock, out, Mode::Interactive);
            run(session, events, &receiver, tick)
        }
        Command::Start { task, minutes } => {
            let mut session = Session::new(SystemClock, stdout.lock(), Mode::Single);
            session.start_single(&task, &minutes)?;
            run(session, events, &receiver, tick)
        }
    }?;

    stdout.lock().flush().context("Failed to flush stdout.")?;
    Ok(())
}
