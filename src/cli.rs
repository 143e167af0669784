use anyhow::{bail, Result};
use humantime::{format_duration, parse_duration};
use std::time::Duration;
use structopt::StructOpt;

const MIN_TICK: Duration = Duration::from_millis(10);
const MAX_TICK: Duration = Duration::from_secs(60 * 60);

/// A refresh interval (parse_duration), between 10ms and 1h.
fn parse_tick(src: &str) -> Result<Duration> {
    let tick = parse_duration(src)?;
    if tick < MIN_TICK || tick > MAX_TICK {
        bail!(
            "tick must be between {} and {}, got {}",
            format_duration(MIN_TICK),
            format_duration(MAX_TICK),
            format_duration(tick)
        );
    }
    Ok(tick)
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Open an interactive session (default).
    Session,
    /// Run a single cycle in the foreground.
    Start {
        /// The task description text.
        #[structopt()]
        task: String,

        /// The cycle duration in minutes, from 1 to 60.
        #[structopt()]
        minutes: String,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "ignite-timer",
    about = "A minimalistic pomodoro countdown."
)]
pub struct CommandLineArgs {
    #[structopt(subcommand)]
    pub action: Option<Command>,

    /// How often the countdown is refreshed (parse_duration).
    #[structopt(short, long, default_value = "1s", parse(try_from_str=parse_tick))]
    pub tick: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_a_one_second_session() {
        let args = CommandLineArgs::from_iter(&["ignite-timer"]);
        assert!(args.action.is_none());
        assert_eq!(args.tick, Duration::from_secs(1));
    }

    #[test]
    fn parses_start() {
        let args = CommandLineArgs::from_iter(&["ignite-timer", "--tick", "500ms", "start", "Read", "10"]);
        assert_eq!(args.tick, Duration::from_millis(500));
        match args.action {
            Some(Command::Start { task, minutes }) => {
                assert_eq!(task, "Read");
                assert_eq!(minutes, "10");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn rejects_a_bad_tick() {
        assert!(CommandLineArgs::from_iter_safe(&["ignite-timer", "--tick", "soon"]).is_err());
    }

    #[test]
    fn rejects_a_tick_out_of_range() {
        assert!(CommandLineArgs::from_iter_safe(&["ignite-timer", "--tick", "0s"]).is_err());
        assert!(CommandLineArgs::from_iter_safe(&["ignite-timer", "--tick", "9ms"]).is_err());
        assert!(CommandLineArgs::from_iter_safe(&["ignite-timer", "--tick", "500000000000years"]).is_err());
        assert!(CommandLineArgs::from_iter_safe(&["ignite-timer", "--tick", "61m"]).is_err());
    }

    #[test]
    fn accepts_the_tick_bounds() {
        assert_eq!(parse_tick("10ms").unwrap(), MIN_TICK);
        assert_eq!(parse_tick("1h").unwrap(), MAX_TICK);
        let error = parse_tick("0s").unwrap_err();
        assert_eq!(error.to_string(), "tick must be between 10ms and 1h, got 0s");
    }
}
