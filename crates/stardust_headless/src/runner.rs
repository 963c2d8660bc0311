//! Line-oriented galaxy runner.

use std::io::{self, BufRead, Write};

use stardust_core::galaxy::{CommandOutcome, Galaxy, GalaxyCommand};
use stardust_core::math::to_seconds_f64;
use stardust_core::replay::Replay;
use tracing::{debug, info, warn};

use crate::protocol::{Action, Request, Response};

/// Headless runner configuration.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Output the full state after every tick (vs only on query).
    pub auto_state_output: bool,
    /// Record applied commands into a replay.
    pub record_replay: bool,
}

/// Drives one galaxy from JSON-lines requests.
#[derive(Debug)]
pub struct HeadlessRunner {
    config: HeadlessConfig,
    galaxy: Galaxy,
    replay: Option<Replay>,
    finished: bool,
}

impl HeadlessRunner {
    /// Create a runner over `galaxy`.
    ///
    /// # Errors
    /// Returns an error if replay recording is enabled and the starting
    /// galaxy cannot be snapshotted.
    pub fn new(galaxy: Galaxy, config: HeadlessConfig) -> stardust_core::error::Result<Self> {
        let replay = if config.record_replay {
            Some(Replay::new("interactive", &galaxy)?)
        } else {
            None
        };
        Ok(Self {
            config,
            galaxy,
            replay,
            finished: false,
        })
    }

    /// The galaxy being driven.
    #[must_use]
    pub const fn galaxy(&self) -> &Galaxy {
        &self.galaxy
    }

    /// Whether a `quit` request was received.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Take the recorded replay, stamped with the current state hash.
    pub fn take_replay(&mut self) -> Option<Replay> {
        let hash = self.galaxy.state_hash();
        self.replay.take().map(|mut replay| {
            replay.finalize(hash);
            replay
        })
    }

    /// Handle one input line and return the responses to write.
    pub fn handle_line(&mut self, line: &str) -> Vec<Response> {
        let line = line.trim();
        if line.is_empty() {
            return Vec::new();
        }
        match Request::from_json(line) {
            Ok(request) => self.handle(request),
            Err(e) => {
                warn!(error = %e, "Unparseable request");
                vec![Response::parse_error(format!("Parse error: {e}"))]
            }
        }
    }

    /// Handle one parsed request.
    pub fn handle(&mut self, request: Request) -> Vec<Response> {
        let name = request.name();
        let action = match request.into_action() {
            Ok(action) => action,
            Err(e) => return vec![Response::game_error(&e, name)],
        };

        match action {
            Action::Galaxy(command) => self.apply(name, command),
            Action::Query => vec![self.state()],
            Action::Hash => vec![Response::Hash {
                elapsed_seconds: to_seconds_f64(self.galaxy.elapsed()),
                hash: self.galaxy.state_hash(),
            }],
            Action::Quit => {
                self.finished = true;
                vec![Response::Bye]
            }
        }
    }

    fn apply(&mut self, name: &str, command: GalaxyCommand) -> Vec<Response> {
        debug!(cmd = name, "Applying command");
        let result = match self.replay.as_mut() {
            Some(replay) => replay.apply_and_record(&mut self.galaxy, command),
            None => self.galaxy.apply(command),
        };

        match result {
            Ok(CommandOutcome::Ticked(events)) => {
                let mut responses = vec![Response::Events {
                    elapsed_seconds: to_seconds_f64(self.galaxy.elapsed()),
                    events: events.attack_events,
                }];
                if self.config.auto_state_output {
                    responses.push(self.state());
                }
                responses
            }
            Ok(outcome) => vec![Response::ack(name, outcome)],
            Err(e) => {
                debug!(cmd = name, error = %e, "Command refused");
                vec![Response::game_error(&e, name)]
            }
        }
    }

    fn state(&self) -> Response {
        Response::State {
            hash: self.galaxy.state_hash(),
            view: self.galaxy.view(),
        }
    }

    /// Read requests from `input` until `quit` or end of input.
    ///
    /// # Errors
    /// Returns an error if reading or writing fails.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        let ready = Response::ready(to_seconds_f64(self.galaxy.elapsed()));
        output.write_all(ready.to_json_line().as_bytes())?;
        output.flush()?;

        for line in input.lines() {
            let line = line?;
            for response in self.handle_line(&line) {
                output.write_all(response.to_json_line().as_bytes())?;
            }
            output.flush()?;
            if self.finished {
                break;
            }
        }

        info!(
            elapsed = to_seconds_f64(self.galaxy.elapsed()),
            hash = self.galaxy.state_hash(),
            "Headless session ended"
        );
        Ok(())
    }
}
