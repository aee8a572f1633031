//! Plays `.http` recipes: a sequence of HTTP requests, each optionally
//! followed by a JavaScript response handler that logs and registers tests.
//!
//! ```text
//! ### Get hello
//! GET http://localhost:8080/hello
//!
//! > {%
//! client.test('status', function() {
//!     client.assert(response.status === 200, 'Response status is not 200');
//! });
//! %}
//! ```

pub mod error;
pub mod models;
pub mod player;
pub mod recipe;
pub mod scanner;
pub mod script;
pub mod transport;

use std::path::Path;

pub use error::{Aborted, ParseError, PlayError, RunError, ScriptError, TransportError};
pub use player::{ExecutedStep, Player, Report};
pub use recipe::{Recipe, ResponseHandler, Step};
pub use script::{HandlerResult, JsRuntime, ResponseView, ScriptRuntime};

/// Parses and plays a recipe file, failing when any handler test failed.
pub async fn run_tests(path: impl AsRef<Path>) -> Result<Report, RunError> {
    let player = Player::parse_file(path)?;
    let report = player.play().await?;
    if report.test_failed() {
        let summary = report.failure_summary();
        return Err(RunError::TestsFailed { report, summary });
    }
    Ok(report)
}
