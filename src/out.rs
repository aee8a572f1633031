use colored::*;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use playcalls::{ExecutedStep, Report};

fn get_timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => {
            let total_secs = duration.as_secs();
            let millis = duration.subsec_millis();
            let hours = (total_secs / 3600) % 24;
            let minutes = (total_secs / 60) % 60;
            let seconds = total_secs % 60;
            format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
        }
        Err(_) => "00:00:00.000".to_string(),
    }
}

pub fn ok(tag: &str, msg: &str) {
    println!("[{}][{}] {}", get_timestamp(), tag.bold().green(), msg.green());
}

pub fn error(tag: &str, msg: &str) {
    println!("[{}][{}] {}", get_timestamp(), tag.bold().red(), msg.red());
}

pub fn info(tag: &str, msg: &str) {
    println!("[{}][{}] {}", get_timestamp(), tag.bold().blue(), msg.blue());
}

pub fn debug(tag: &str, msg: &str) {
    println!("[{}][{}] {}", get_timestamp(), tag.bold(), msg);
}

fn step_tag(index: usize, executed: &ExecutedStep) -> String {
    match executed.step.name() {
        "" => format!("#{}", index + 1),
        name => format!("#{} {}", index + 1, name),
    }
}

/// One line per step, then its handler console and failures.
pub fn print_report(recipe: &str, report: &Report) {
    for (index, executed) in report.steps().iter().enumerate() {
        let tag = step_tag(index, executed);
        let line = format!(
            "{} {} -> {}",
            executed.request.method, executed.request.url, executed.response.status
        );
        if executed.failed() {
            error(&tag, &line);
        } else {
            ok(&tag, &line);
        }
        for console_line in executed.console().lines() {
            debug(&tag, console_line);
        }
        for failure in executed.failures() {
            error(&tag, &format!("failure: {}", failure));
        }
    }
    if report.test_failed() {
        error(recipe, "at least one test failed");
    } else {
        ok(recipe, &format!("{} step(s) passed", report.steps().len()));
    }
}
