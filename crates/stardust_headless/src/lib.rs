//! Headless galaxy driver for scripted runs and CI verification.
//!
//! A galaxy can be driven without any presentation layer:
//!
//! - **Interactive**: JSON commands on stdin, responses on stdout
//! - **Scenarios**: RON scripts with expectations, reported as JSON
//! - **Determinism checks**: the same scenario on parallel worker threads
//! - **Replays**: recorded sessions played back and hash-verified
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from the controller (tick, launch, upgrade, etc.)
//! - **stdout**: Responses (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See [`protocol`] module for the full command/response format.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"tick","seconds":60}' | cargo run -p stardust_headless
//!
//! # Run a scenario
//! cargo run -p stardust_headless -- scenario --file scenarios/raid.ron
//!
//! # Verify a recorded replay
//! cargo run -p stardust_headless -- replay --file raid.replay --verify
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod protocol;
pub mod runner;
pub mod scenario;

pub use batch::{verify_determinism, DeterminismReport};
pub use protocol::{Request, Response};
pub use runner::{HeadlessConfig, HeadlessRunner};
pub use scenario::{Scenario, ScenarioError, ScenarioReport};
