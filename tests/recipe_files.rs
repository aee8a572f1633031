mod common;

use std::fs;
use std::path::PathBuf;

use playcalls::{run_tests, Player, ResponseHandler, RunError};

use common::start_server;

const HELLO_RECIPE: &str = include_str!("data/hello.http");
const HELLO_HANDLER: &str = include_str!("data/check_hello.js");

/// Writes the hello recipe, pointed at `host`, next to its handler file.
fn write_hello(dir: &tempfile::TempDir, host: &str, handler: &str) -> PathBuf {
    let recipe = dir.path().join("hello.http");
    fs::write(&recipe, HELLO_RECIPE.replace("{{host}}", host)).unwrap();
    fs::write(dir.path().join("check_hello.js"), handler).unwrap();
    recipe
}

#[test]
fn hello_recipe_parses_both_handler_kinds() {
    let player = Player::parse_str(&HELLO_RECIPE.replace("{{host}}", "localhost:8080")).unwrap();
    let steps = player.steps();

    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].name(), "Get hello");
    assert_eq!(
        steps[0].response_handler(),
        Some(&ResponseHandler::File(PathBuf::from("check_hello.js")))
    );
    assert_eq!(steps[1].url(), "http://localhost:8080/missing");
    assert!(matches!(
        steps[1].response_handler(),
        Some(ResponseHandler::Embedded(source)) if source.contains("expected 404")
    ));
}

#[tokio::test]
async fn handler_file_is_loaded_next_to_the_recipe() {
    let server = start_server().await;
    let dir = tempfile::tempdir().unwrap();
    let recipe = write_hello(&dir, &server.addr.to_string(), HELLO_HANDLER);

    let report = Player::parse_file(&recipe).unwrap().play().await.unwrap();

    assert_eq!(report.steps().len(), 2);
    assert_eq!(
        report.steps()[0].console(),
        "hello handler: 200\nRUN: status is 200\nPASS: status is 200\nRUN: greets Double Belomor\nPASS: greets Double Belomor\n"
    );
    assert!(report.passed());
}

#[tokio::test]
async fn run_tests_passes_a_green_recipe() {
    let server = start_server().await;
    let dir = tempfile::tempdir().unwrap();
    let recipe = write_hello(&dir, &server.addr.to_string(), HELLO_HANDLER);

    let report = run_tests(&recipe).await.unwrap();
    assert_eq!(server.calls(), vec!["GET /hello", "GET /missing"]);
    assert!(report.passed());
}

#[tokio::test]
async fn run_tests_reports_failures_with_console() {
    let server = start_server().await;
    let dir = tempfile::tempdir().unwrap();
    let handler = "client.test('wrong status', function() { client.assert(response.status === 500, 'status was ' + response.status); });";
    let recipe = write_hello(&dir, &server.addr.to_string(), handler);

    match run_tests(&recipe).await {
        Err(RunError::TestsFailed { report, summary }) => {
            assert_eq!(report.steps().len(), 2);
            assert!(summary.contains("--- Get hello"), "{summary}");
            assert!(summary.contains("FAILED: wrong status"), "{summary}");
            assert!(summary.contains("failure: Error: status was 200"), "{summary}");
        }
        other => panic!("expected failed tests, got {other:?}"),
    }
}

#[tokio::test]
async fn run_tests_surfaces_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    let recipe = dir.path().join("broken.http");
    fs::write(&recipe, "### broken\nFETCH http://localhost/\n").unwrap();

    let err = run_tests(&recipe).await.unwrap_err();
    assert!(matches!(err, RunError::Parse(_)));
}
