use std::path::{Path, PathBuf};
use std::sync::Arc;

use hyper::Method;
use url::Url;

use crate::error::{Aborted, ParseError, PlayError};
use crate::recipe::{Recipe, ResponseHandler, Step};
use crate::script::{HandlerResult, JsRuntime, ResponseView, ScriptRuntime};
use crate::transport::{
    DialTransport, Dialer, HttpClient, RequestRecord, ResponseRecord, Transport,
};

/// One step as it was played.
#[derive(Debug, Clone)]
pub struct ExecutedStep {
    pub step: Step,
    pub request: RequestRecord,
    pub response: ResponseRecord,
    pub handler: HandlerResult,
}

impl ExecutedStep {
    pub fn console(&self) -> &str {
        &self.handler.console
    }

    pub fn failures(&self) -> &[String] {
        &self.handler.failures
    }

    pub fn failed(&self) -> bool {
        self.handler.failed()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Report {
    steps: Vec<ExecutedStep>,
}

impl Report {
    pub fn steps(&self) -> &[ExecutedStep] {
        &self.steps
    }

    /// True when any handler test failed.
    pub fn test_failed(&self) -> bool {
        self.steps.iter().any(ExecutedStep::failed)
    }

    pub fn passed(&self) -> bool {
        !self.test_failed()
    }

    /// Console output and failures of every failed step, for test logs.
    pub fn failure_summary(&self) -> String {
        let mut summary = String::new();
        for executed in self.steps.iter().filter(|s| s.failed()) {
            summary.push_str(&format!("--- {}\n", executed.step.name()));
            summary.push_str(executed.console());
            for failure in executed.failures() {
                summary.push_str(&format!("failure: {failure}\n"));
            }
        }
        summary
    }
}

/// Plays the steps of a recipe in order against live endpoints.
///
/// Steps run one at a time; the first transport or handler error stops the
/// play and is returned together with the steps that already completed.
pub struct Player {
    recipe: Recipe,
    transport: Arc<dyn Transport>,
    runtime: Arc<dyn ScriptRuntime>,
    base_dir: Option<PathBuf>,
}

impl Player {
    pub fn new(recipe: Recipe) -> Self {
        Self {
            recipe,
            transport: Arc::new(HttpClient::new()),
            runtime: Arc::new(JsRuntime::new()),
            base_dir: None,
        }
    }

    pub fn parse_str(source: &str) -> Result<Self, ParseError> {
        Ok(Self::new(Recipe::parse(source)?))
    }

    /// Handler files named in the recipe resolve against its directory.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let player = Self::new(Recipe::from_file(path)?);
        Ok(match path.parent() {
            Some(dir) => player.with_base_dir(dir),
            None => player,
        })
    }

    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn with_dialer(self, dialer: impl Dialer + 'static) -> Self {
        self.with_transport(DialTransport::new(dialer))
    }

    pub fn with_runtime(mut self, runtime: impl ScriptRuntime + 'static) -> Self {
        self.runtime = Arc::new(runtime);
        self
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn steps(&self) -> &[Step] {
        self.recipe.steps()
    }

    pub async fn play(&self) -> Result<Report, Aborted> {
        let mut report = Report::default();
        for (index, step) in self.recipe.steps().iter().enumerate() {
            match self.play_step(step).await {
                Ok(executed) => {
                    tracing::info!(
                        index,
                        step = step.name(),
                        status = executed.response.status.as_u16(),
                        failures = executed.failures().len(),
                        "step played"
                    );
                    report.steps.push(executed);
                }
                Err(error) => {
                    tracing::warn!(index, step = step.name(), %error, "play aborted");
                    return Err(Aborted { report, error });
                }
            }
        }
        Ok(report)
    }

    async fn play_step(&self, step: &Step) -> Result<ExecutedStep, PlayError> {
        let url = Url::parse(step.url()).map_err(|source| PlayError::InvalidUrl {
            step: step.name().to_string(),
            url: step.url().to_string(),
            source,
        })?;
        let method =
            Method::from_bytes(step.method().as_bytes()).map_err(|_| PlayError::InvalidMethod {
                step: step.name().to_string(),
                method: step.method().to_string(),
            })?;
        let request = RequestRecord { method, url };
        tracing::debug!(method = %request.method, url = %request.url, "sending request");

        let response =
            self.transport
                .send(&request)
                .await
                .map_err(|source| PlayError::Transport {
                    step: step.name().to_string(),
                    source,
                })?;

        let handler = match step.response_handler() {
            Some(handler) => {
                let source = self.handler_source(step, handler)?;
                self.runtime
                    .run(&source, &ResponseView::from(&response))
                    .map_err(|source| PlayError::Handler {
                        step: step.name().to_string(),
                        source,
                    })?
            }
            None => HandlerResult::default(),
        };

        Ok(ExecutedStep {
            step: step.clone(),
            request,
            response,
            handler,
        })
    }

    fn handler_source(&self, step: &Step, handler: &ResponseHandler) -> Result<String, PlayError> {
        match handler {
            ResponseHandler::Embedded(source) => Ok(source.clone()),
            ResponseHandler::File(path) => {
                let path = match &self.base_dir {
                    Some(dir) if path.is_relative() => dir.join(path),
                    _ => path.clone(),
                };
                std::fs::read_to_string(&path).map_err(|source| PlayError::HandlerFile {
                    step: step.name().to_string(),
                    path,
                    source,
                })
            }
        }
    }
}
