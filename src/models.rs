use serde::Serialize;

use crate::player::{ExecutedStep, Report};

#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub recipe: String,
    pub passed: bool,
    pub steps: Vec<StepSummary>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StepSummary {
    pub name: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub console: String,
    pub failures: Vec<String>,
}

impl ReportSummary {
    pub fn new(recipe: impl Into<String>, report: &Report, error: Option<String>) -> Self {
        Self {
            recipe: recipe.into(),
            passed: error.is_none() && report.passed(),
            steps: report.steps().iter().map(StepSummary::from).collect(),
            error,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl From<&ExecutedStep> for StepSummary {
    fn from(executed: &ExecutedStep) -> Self {
        Self {
            name: executed.step.name().to_string(),
            method: executed.request.method.to_string(),
            url: executed.request.url.to_string(),
            status: executed.response.status.as_u16(),
            console: executed.console().to_string(),
            failures: executed.failures().to_vec(),
        }
    }
}
