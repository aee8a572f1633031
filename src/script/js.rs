use boa_engine::object::{IntegrityLevel, ObjectInitializer};
use boa_engine::property::Attribute;
use boa_engine::{
    js_string, Context, JsArgs, JsError, JsNativeError, JsObject, JsResult, JsString, JsValue,
    NativeFunction, Source,
};
use boa_gc::{Finalize, Gc, GcRefCell, Trace};

use super::{HandlerResult, ResponseView, ScriptRuntime};
use crate::error::ScriptError;

const CLIENT_NAME: &str = "HTTP Client";
const CONSOLE_METHODS: &[&str] = &["log", "info", "warn", "error", "debug"];

/// JavaScript handlers on an embedded boa engine.
///
/// The script only sees `response`, `console` and `client`. Console text,
/// registered tests and failures live on the Rust side of the bindings.
#[derive(Debug, Clone)]
pub struct JsRuntime {
    loop_iteration_limit: u64,
}

impl JsRuntime {
    pub const DEFAULT_LOOP_ITERATION_LIMIT: u64 = 1_000_000;

    pub fn new() -> Self {
        Self {
            loop_iteration_limit: Self::DEFAULT_LOOP_ITERATION_LIMIT,
        }
    }

    pub fn with_loop_iteration_limit(mut self, limit: u64) -> Self {
        self.loop_iteration_limit = limit;
        self
    }

    fn context(&self) -> Context {
        let mut context = Context::default();
        context
            .runtime_limits_mut()
            .set_loop_iteration_limit(self.loop_iteration_limit);
        context
    }
}

impl Default for JsRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default, Trace, Finalize)]
struct Session {
    console: String,
    failures: Vec<String>,
    tests: Vec<RegisteredTest>,
}

impl Session {
    fn write_line(&mut self, line: &str) {
        self.console.push_str(line);
        self.console.push('\n');
    }
}

#[derive(Trace, Finalize)]
struct RegisteredTest {
    name: String,
    func: JsObject,
}

type Shared = Gc<GcRefCell<Session>>;

impl ScriptRuntime for JsRuntime {
    fn run(&self, source: &str, response: &ResponseView) -> Result<HandlerResult, ScriptError> {
        let mut context = self.context();
        let session: Shared = Gc::new(GcRefCell::new(Session::default()));
        let bound = install(&mut context, &session, response)
            .map_err(|err| ScriptError::Engine(describe(err, &mut context)))?;

        if let Err(err) = context.eval(Source::from_bytes(source)) {
            return Err(handler_error(err, &session, &mut context));
        }

        // tests registered while the tests run are not picked up
        let tests = std::mem::take(&mut session.borrow_mut().tests);
        for test in tests {
            session.borrow_mut().write_line(&format!("RUN: {}", test.name));
            match test.func.call(&JsValue::undefined(), &[bound.clone()], &mut context) {
                Ok(_) => session
                    .borrow_mut()
                    .write_line(&format!("PASS: {}", test.name)),
                Err(err) if is_runtime_limit(&err) => {
                    return Err(handler_error(err, &session, &mut context));
                }
                Err(err) => {
                    let failure = describe(err, &mut context);
                    let mut session = session.borrow_mut();
                    session.write_line(&format!("FAILED: {}", test.name));
                    session.write_line(&failure);
                    session.failures.push(failure);
                }
            }
        }

        let (console, failures) = {
            let mut session = std::mem::take(&mut *session.borrow_mut());
            (
                std::mem::take(&mut session.console),
                std::mem::take(&mut session.failures),
            )
        };
        tracing::debug!(failures = failures.len(), "response handler finished");
        Ok(HandlerResult { console, failures })
    }
}

/// Defines the `response`, `console` and `client` globals, all frozen.
/// Returns the bound response value.
fn install(context: &mut Context, session: &Shared, response: &ResponseView) -> JsResult<JsValue> {
    let console = {
        let mut console = ObjectInitializer::new(context);
        for method in CONSOLE_METHODS {
            console.function(
                NativeFunction::from_copy_closure_with_captures(console_write, session.clone()),
                JsString::from(*method),
                0,
            );
        }
        console.build()
    };

    let client = ObjectInitializer::new(context)
        .property(
            js_string!("name"),
            js_string!(CLIENT_NAME),
            Attribute::READONLY | Attribute::ENUMERABLE,
        )
        .function(
            NativeFunction::from_copy_closure_with_captures(client_log, session.clone()),
            js_string!("log"),
            1,
        )
        .function(
            NativeFunction::from_copy_closure_with_captures(client_test, session.clone()),
            js_string!("test"),
            2,
        )
        .function(NativeFunction::from_fn_ptr(client_assert), js_string!("assert"), 2)
        .build();

    let json = serde_json::to_value(response)
        .map_err(|err| JsNativeError::error().with_message(err.to_string()))?;
    let bound = JsValue::from_json(&json, context)?;
    if let Some(object) = bound.as_object() {
        if let Some(headers) = object.get(js_string!("headers"), context)?.as_object() {
            headers.set_integrity_level(IntegrityLevel::Frozen, context)?;
        }
        object.set_integrity_level(IntegrityLevel::Frozen, context)?;
    }

    for object in [&console, &client] {
        object.set_integrity_level(IntegrityLevel::Frozen, context)?;
    }
    context.register_global_property(js_string!("console"), console, Attribute::READONLY)?;
    context.register_global_property(js_string!("client"), client, Attribute::READONLY)?;
    context.register_global_property(js_string!("response"), bound.clone(), Attribute::READONLY)?;
    Ok(bound)
}

fn console_write(
    _: &JsValue,
    args: &[JsValue],
    session: &Shared,
    context: &mut Context,
) -> JsResult<JsValue> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(arg.to_string(context)?.to_std_string_escaped());
    }
    session.borrow_mut().write_line(&parts.join(" "));
    Ok(JsValue::undefined())
}

fn client_log(
    _: &JsValue,
    args: &[JsValue],
    session: &Shared,
    context: &mut Context,
) -> JsResult<JsValue> {
    let line = args.get_or_undefined(0).to_string(context)?;
    session.borrow_mut().write_line(&line.to_std_string_escaped());
    Ok(JsValue::undefined())
}

fn client_test(
    _: &JsValue,
    args: &[JsValue],
    session: &Shared,
    context: &mut Context,
) -> JsResult<JsValue> {
    let name = args
        .get_or_undefined(0)
        .to_string(context)?
        .to_std_string_escaped();
    let func = args
        .get_or_undefined(1)
        .as_callable()
        .cloned()
        .ok_or_else(|| JsNativeError::typ().with_message(format!("test '{name}' is not a function")))?;
    session.borrow_mut().tests.push(RegisteredTest { name, func });
    Ok(JsValue::undefined())
}

fn client_assert(_: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    if args.get_or_undefined(0).to_boolean() {
        return Ok(JsValue::undefined());
    }
    let message = match args.get_or_undefined(1) {
        message if message.is_undefined() => String::new(),
        message => message.to_string(context)?.to_std_string_escaped(),
    };
    Err(JsNativeError::error().with_message(message).into())
}

fn handler_error(err: JsError, session: &Shared, context: &mut Context) -> ScriptError {
    let message = describe(err, context);
    let console = std::mem::take(&mut session.borrow_mut().console);
    ScriptError::Handler { message, console }
}

fn is_runtime_limit(err: &JsError) -> bool {
    err.as_native().is_some_and(JsNativeError::is_runtime_limit)
}

/// Renders an error the way `String(e)` would inside the script.
fn describe(err: JsError, context: &mut Context) -> String {
    match err.as_opaque() {
        Some(thrown) => thrown
            .to_string(context)
            .map(|text| text.to_std_string_escaped())
            .unwrap_or_else(|_| err.to_string()),
        None => err.to_string(),
    }
}
