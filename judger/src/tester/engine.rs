//! The execution engine: turns a source text into a callable `solution` inside
//! an embedded QuickJS context and invokes it on test inputs.
//!
//! The context only carries the ECMAScript standard library plus a `console`
//! that writes to the log. There is no module loader, no network and no
//! timers. Every engine owns its own runtime; nothing is shared between two
//! engines.

use derive_builder::Builder;
use rquickjs::{Context, Ctx, Function, Runtime, Value};
use serde::{Deserialize, Serialize};

use super::model::{ExecutionOutcome, TestCase};
use crate::prelude::CancellationToken;

/// Name of the entry point every submission must define.
pub const SOLUTION_FN: &str = "solution";

pub const DEFAULT_MEMORY_LIMIT: usize = 50 * 1024 * 1024;
pub const DEFAULT_MAX_STACK_SIZE: usize = 1024 * 1024;

const CONSOLE_SINK_FN: &str = "__judgeConsole";

const CONSOLE_PRELUDE: &str = r#"
var console = (function (sink) {
    const emit = (level) => (...args) => sink(level, args.map((a) => String(a)).join(" "));
    return {
        log: emit("info"),
        info: emit("info"),
        debug: emit("debug"),
        warn: emit("warn"),
        error: emit("error"),
    };
})(__judgeConsole);
"#;

/// Resource limits applied to every engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
#[serde(default, rename_all = "kebab-case")]
pub struct EngineLimits {
    /// Heap limit of the script runtime, in bytes.
    #[builder(default = "DEFAULT_MEMORY_LIMIT")]
    pub memory_limit: usize,

    /// Maximum JS stack size, in bytes. The hosting thread's stack must be
    /// larger than this.
    #[builder(default = "DEFAULT_MAX_STACK_SIZE")]
    pub max_stack_size: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        EngineLimits {
            memory_limit: DEFAULT_MEMORY_LIMIT,
            max_stack_size: DEFAULT_MAX_STACK_SIZE,
        }
    }
}

pub struct Engine {
    ctx: Context,
    _rt: Runtime,
}

impl Engine {
    /// Creates a fresh runtime and context.
    ///
    /// Once `interrupt` is cancelled, whatever script is running is aborted at
    /// the engine's next interrupt poll, including tight loops that never
    /// yield.
    pub fn new(limits: &EngineLimits, interrupt: CancellationToken) -> rquickjs::Result<Engine> {
        let rt = Runtime::new()?;
        rt.set_memory_limit(limits.memory_limit);
        rt.set_max_stack_size(limits.max_stack_size);
        rt.set_interrupt_handler(Some(Box::new(move || interrupt.is_cancelled())));
        let ctx = Context::full(&rt)?;
        let engine = Engine { ctx, _rt: rt };
        engine.install_console()?;
        Ok(engine)
    }

    fn install_console(&self) -> rquickjs::Result<()> {
        self.ctx.with(|ctx| {
            let sink = Function::new(ctx.clone(), |level: String, line: String| {
                match level.as_str() {
                    "debug" => tracing::debug!(target: "judge_console", "{}", line),
                    "warn" => tracing::warn!(target: "judge_console", "{}", line),
                    "error" => tracing::error!(target: "judge_console", "{}", line),
                    _ => tracing::info!(target: "judge_console", "{}", line),
                }
            })?;
            ctx.globals().set(CONSOLE_SINK_FN, sink)?;
            ctx.eval::<Value, _>(CONSOLE_PRELUDE)?;
            Ok(())
        })
    }

    /// Run mode: evaluate the whole source as a function body that ends by
    /// returning `solution(input)`, with `input` inlined as a string literal.
    pub fn run(&self, source: &str, input: &str) -> ExecutionOutcome {
        let script = run_wrapper(source, input);
        self.ctx.with(|ctx| {
            let result = ctx
                .eval::<Value, _>(script)
                .and_then(|value| stringify(&ctx, value));
            settle(&ctx, result)
        })
    }

    /// Submit mode: compile `solution` once, then call it once per case, in
    /// order.
    ///
    /// A source that fails to compile fails every case with the same message.
    pub fn run_batch(&self, source: &str, cases: &[TestCase]) -> Vec<ExecutionOutcome> {
        let script = submit_wrapper(source);
        self.ctx.with(|ctx| {
            let solution = match ctx.eval::<Value, _>(script) {
                Ok(value) => value.into_function(),
                Err(e) => {
                    let message = describe_error(&ctx, e);
                    return vec![ExecutionOutcome::RuntimeFailure { message }; cases.len()];
                }
            };
            let solution = match solution {
                Some(f) => f,
                None => {
                    let message = format!("`{}` is not defined as a function", SOLUTION_FN);
                    return vec![ExecutionOutcome::RuntimeFailure { message }; cases.len()];
                }
            };

            cases
                .iter()
                .map(|case| {
                    let result = solution
                        .call::<_, Value>((case.input.as_str(),))
                        .and_then(|value| stringify(&ctx, value));
                    settle(&ctx, result)
                })
                .collect()
        })
    }
}

fn run_wrapper(source: &str, input: &str) -> String {
    // JSON strings are JS string literals, save for the two line separators.
    let literal = serde_json::Value::String(input.to_owned())
        .to_string()
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029");
    format!(
        "(function () {{\n{}\n;return {}({});\n}})()",
        source, SOLUTION_FN, literal
    )
}

fn submit_wrapper(source: &str) -> String {
    format!(
        "(function () {{\n{}\n;return typeof {f} === \"function\" ? {f} : undefined;\n}})()",
        source,
        f = SOLUTION_FN
    )
}

/// `String(value)`, as the script itself would compute it.
fn stringify<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> rquickjs::Result<String> {
    if let Some(s) = value.as_string() {
        return s.to_string();
    }
    let to_string: Function = ctx.globals().get("String")?;
    to_string.call((value,))
}

fn settle<'js>(ctx: &Ctx<'js>, result: rquickjs::Result<String>) -> ExecutionOutcome {
    match result {
        Ok(output) => ExecutionOutcome::Success { output },
        Err(e) => ExecutionOutcome::RuntimeFailure {
            message: describe_error(ctx, e),
        },
    }
}

/// Turn an engine error into the message a user would see from `err.message`.
fn describe_error<'js>(ctx: &Ctx<'js>, error: rquickjs::Error) -> String {
    if !matches!(error, rquickjs::Error::Exception) {
        return error.to_string();
    }
    let thrown = ctx.catch();
    let message = thrown
        .as_object()
        .and_then(|obj| match obj.get::<_, Option<String>>("message") {
            Ok(message) => message,
            Err(_) => {
                ctx.catch();
                None
            }
        });
    if let Some(message) = message {
        return message;
    }
    stringify(ctx, thrown).unwrap_or_else(|_| {
        ctx.catch();
        "uncaught exception".to_owned()
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prelude::CancellationTokenHandle;
    use pretty_assertions::assert_eq;

    const SUM: &str = r#"function solution(input){ const [a,b]=input.split(" ").map(Number); return a+b; }"#;

    fn engine() -> Engine {
        Engine::new(&EngineLimits::default(), CancellationToken::never()).unwrap()
    }

    fn success(output: &str) -> ExecutionOutcome {
        ExecutionOutcome::Success {
            output: output.into(),
        }
    }

    #[test]
    fn run_mode_returns_stringified_value() {
        assert_eq!(engine().run(SUM, "3 5"), success("8"));
        assert_eq!(
            engine().run("function solution(){ return [1, 2, 3]; }", ""),
            success("1,2,3")
        );
        assert_eq!(
            engine().run("function solution(){ }", ""),
            success("undefined")
        );
    }

    #[test]
    fn input_is_passed_verbatim() {
        let src = "function solution(input){ return input; }";
        let tricky = "line \"one\"\nline 'two' \\ ${x} \u{2028}";
        assert_eq!(engine().run(src, tricky), success(tricky));
    }

    #[test]
    fn thrown_errors_become_runtime_failures() {
        let out = engine().run("function solution(){ throw new Error('boom'); }", "");
        assert_eq!(
            out,
            ExecutionOutcome::RuntimeFailure {
                message: "boom".into()
            }
        );

        let out = engine().run("function solution(){ throw 'plain'; }", "");
        assert_eq!(
            out,
            ExecutionOutcome::RuntimeFailure {
                message: "plain".into()
            }
        );
    }

    #[test]
    fn syntax_errors_are_runtime_failures() {
        let out = engine().run("function solution( { return 1; }", "");
        assert!(matches!(out, ExecutionOutcome::RuntimeFailure { .. }), "{:?}", out);

        let outs = engine().run_batch("function solution( {", &[TestCase::new("", "")]);
        assert!(matches!(outs[0], ExecutionOutcome::RuntimeFailure { .. }));
    }

    #[test]
    fn missing_solution_fails_every_case() {
        let cases = vec![TestCase::new("1", "1"), TestCase::new("2", "2")];
        let outs = engine().run_batch("function solve(x){ return x; }", &cases);
        assert_eq!(
            outs,
            vec![
                ExecutionOutcome::RuntimeFailure {
                    message: "`solution` is not defined as a function".into()
                };
                2
            ]
        );
    }

    #[test]
    fn batch_compiles_once_and_keeps_order() {
        let src = r#"
        let calls = 0;
        function solution(input){ calls += 1; return input + ":" + calls; }
        "#;
        let cases = vec![
            TestCase::new("a", ""),
            TestCase::new("b", ""),
            TestCase::new("c", ""),
        ];
        assert_eq!(
            engine().run_batch(src, &cases),
            vec![success("a:1"), success("b:2"), success("c:3")]
        );
    }

    #[test]
    fn one_failing_case_does_not_poison_the_rest() {
        let src = r#"function solution(input){ if (input === "bad") throw new RangeError("nope"); return input; }"#;
        let cases = vec![TestCase::new("ok", ""), TestCase::new("bad", ""), TestCase::new("fine", "")];
        let outs = engine().run_batch(src, &cases);
        assert_eq!(outs[0], success("ok"));
        assert_eq!(
            outs[1],
            ExecutionOutcome::RuntimeFailure {
                message: "nope".into()
            }
        );
        assert_eq!(outs[2], success("fine"));
    }

    #[test]
    fn console_is_available() {
        let src = "function solution(x){ console.log('got', x, {a: 1}); console.error(); return x; }";
        assert_eq!(engine().run(src, "hi"), success("hi"));
    }

    #[test]
    fn cancelled_token_interrupts_tight_loops() {
        let handle = CancellationTokenHandle::new();
        let engine = Engine::new(&EngineLimits::default(), handle.get_token()).unwrap();
        handle.cancel();
        let out = engine.run("function solution(){ while(true){} }", "");
        assert!(matches!(out, ExecutionOutcome::RuntimeFailure { .. }), "{:?}", out);
    }

    #[test]
    fn limits_builder_defaults() {
        let limits = EngineLimitsBuilder::default()
            .memory_limit(8usize * 1024 * 1024)
            .build()
            .unwrap();
        assert_eq!(limits.memory_limit, 8 * 1024 * 1024);
        assert_eq!(limits.max_stack_size, DEFAULT_MAX_STACK_SIZE);
    }
}
