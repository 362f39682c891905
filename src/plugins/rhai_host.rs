// src/plugins/rhai_host.rs — Rhai script plugins
//
// An entry script is "imported" by compiling it and running its top-level
// statements once. Hooks are plain script functions:
//
//   fn on_request(ctx, log)        required
//   fn on_load(log, ctx)           optional
//   fn on_unload(log)              optional
//   fn command()                   optional, returns the command block map
//   fn scripts()                   optional, returns the UI panel map
//   fn trigger(channel, log, ctx)  optional, runs a panel control
//
// Scripts get no I/O of their own; everything goes through `log` and
// `ctx.utils`.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use rhai::{CallFnOptions, Dynamic, Engine, FnPtr, FuncArgs, Scope, AST};
use serde::Deserialize;

use crate::commands::{
    callback, CommandCallback, CommandFlow, CommandSpec, OptionSpec, OptionValue, SubCommand,
};
use crate::plugins::context::{LoadContext, PluginLog, RequestContext, Severity};
use crate::plugins::handler::{Capabilities, ModuleLoader, PluginHandler, ScriptPanel};
use crate::utils::Utils;

// ---------------------------------------------------------------------------
// Script-facing types
// ---------------------------------------------------------------------------

/// `log` as seen by scripts.
#[derive(Clone)]
struct ScriptLog(PluginLog);

/// `ctx.utils` as seen by scripts.
#[derive(Clone)]
struct ScriptUtils(Utils);

fn message(value: &Dynamic) -> String {
    match value.clone().into_string() {
        Ok(s) => s,
        Err(_) => value.to_string(),
    }
}

/// Drive a future from a blocking script call.
///
/// Script hooks run on the blocking pool, where the runtime handle is
/// available and blocking is allowed.
fn block_on<F: Future>(what: &str, fut: F) -> Option<F::Output> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => Some(handle.block_on(fut)),
        Err(_) => {
            tracing::warn!("{} called outside the runtime, ignored", what);
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Engine factory
// ---------------------------------------------------------------------------

/// Create the engine shared by all script plugins.
pub fn create_rhai_engine() -> Engine {
    let mut engine = Engine::new();

    engine.set_max_expr_depths(64, 32);
    engine.set_max_operations(5_000_000);
    engine.set_max_string_size(16 * 1_048_576);
    engine.set_max_array_size(100_000);
    engine.set_max_map_size(10_000);

    engine.register_type_with_name::<ScriptLog>("Log");
    engine.register_fn("info", |log: &mut ScriptLog, msg: Dynamic| {
        log.0.info(&message(&msg))
    });
    engine.register_fn("warn", |log: &mut ScriptLog, msg: Dynamic| {
        log.0.warn(&message(&msg))
    });
    engine.register_fn("error", |log: &mut ScriptLog, msg: Dynamic| {
        log.0.error(&message(&msg))
    });
    engine.register_fn("to_web", |log: &mut ScriptLog, msg: Dynamic| {
        log.0.to_web(&message(&msg), Severity::default())
    });
    engine.register_fn(
        "to_web",
        |log: &mut ScriptLog, msg: Dynamic, severity: &str| {
            log.0.to_web(&message(&msg), Severity::parse(severity))
        },
    );

    engine.register_type_with_name::<ScriptUtils>("Utils");
    engine.register_fn("sanitize", |u: &mut ScriptUtils, s: &str| u.0.sanitize(s));
    engine.register_fn("to_simplified", |u: &mut ScriptUtils, s: &str| {
        u.0.to_simplified(s)
    });
    engine.register_fn("fetch_image", |u: &mut ScriptUtils, url: &str| -> Dynamic {
        match block_on("fetch_image", u.0.fetch_image(url)).flatten() {
            Some(bytes) => Dynamic::from_blob(bytes),
            None => Dynamic::UNIT,
        }
    });
    engine.register_fn(
        "write_data",
        |u: &mut ScriptUtils, dir: &str, data: Dynamic| -> Dynamic {
            let data = dynamic_to_json(&data);
            match block_on("write_data", u.0.write_data(Path::new(dir), data)) {
                Some(Ok(entry)) => json_to_dynamic(&entry),
                Some(Err(e)) => {
                    tracing::warn!("write_data to {} failed: {}", dir, e);
                    Dynamic::UNIT
                }
                None => Dynamic::UNIT,
            }
        },
    );
    engine.register_fn(
        "write_data_url",
        |u: &mut ScriptUtils, url: &str, dir: &str| -> Dynamic {
            match block_on("write_data_url", u.0.write_data_url(url, Path::new(dir))).flatten() {
                Some(path) => Dynamic::from(path.display().to_string()),
                None => Dynamic::UNIT,
            }
        },
    );

    engine
}

// ---------------------------------------------------------------------------
// Module loader
// ---------------------------------------------------------------------------

/// Imports `.rhai` entry files.
pub struct RhaiModuleLoader {
    engine: Arc<Engine>,
}

impl RhaiModuleLoader {
    pub fn new() -> Self {
        Self {
            engine: Arc::new(create_rhai_engine()),
        }
    }
}

impl Default for RhaiModuleLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleLoader for RhaiModuleLoader {
    fn extensions(&self) -> &[&str] {
        &["rhai"]
    }

    fn import(&self, entry: &Path, ctx: &LoadContext) -> anyhow::Result<Arc<dyn PluginHandler>> {
        let source = std::fs::read_to_string(entry)
            .with_context(|| format!("reading {}", entry.display()))?;
        let plugin = ScriptPlugin::compile(self.engine.clone(), &ctx.plugin_id, &source)?;
        Ok(Arc::new(plugin))
    }
}

// ---------------------------------------------------------------------------
// ScriptPlugin
// ---------------------------------------------------------------------------

/// Command block returned by a script's `command()`.
#[derive(Debug, Deserialize)]
struct CommandBlock {
    /// Name of the script function run for the main command.
    execute: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    example_usage: Option<String>,
    #[serde(default)]
    options: Vec<OptionSpec>,
    #[serde(default)]
    sub_commands: Vec<SubCommandBlock>,
}

#[derive(Debug, Deserialize)]
struct SubCommandBlock {
    name: String,
    execute: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    example_usage: Option<String>,
}

/// A plugin backed by a compiled Rhai script.
pub struct ScriptPlugin {
    name: String,
    engine: Arc<Engine>,
    ast: Arc<AST>,
    capabilities: Capabilities,
    command: Option<CommandSpec>,
    scripts: Option<ScriptPanel>,
}

impl ScriptPlugin {
    /// Compile `source`, run its top-level statements and detect its hooks.
    pub fn compile(engine: Arc<Engine>, name: &str, source: &str) -> anyhow::Result<Self> {
        let ast = engine
            .compile(source)
            .map_err(|e| anyhow::anyhow!("failed to compile script '{name}': {e}"))?;

        engine
            .run_ast_with_scope(&mut Scope::new(), &ast)
            .map_err(|e| anyhow::anyhow!("script '{name}' failed at top level: {e}"))?;

        let capabilities = Capabilities {
            on_request: has_fn(&ast, "on_request", 2),
            on_load: has_fn(&ast, "on_load", 2),
            on_unload: has_fn(&ast, "on_unload", 1),
            command: has_fn(&ast, "command", 0),
            scripts: has_fn(&ast, "scripts", 0),
        };

        let mut plugin = Self {
            name: name.to_string(),
            engine,
            ast: Arc::new(ast),
            capabilities,
            command: None,
            scripts: None,
        };

        if capabilities.command {
            let block = plugin.call_sync("command", ())?;
            plugin.command = Some(plugin.command_spec(block)?);
        }
        if capabilities.scripts {
            let panel = dynamic_to_json(&plugin.call_sync("scripts", ())?);
            plugin.scripts = Some(
                serde_json::from_value(panel)
                    .with_context(|| format!("script '{name}' returned an invalid panel"))?,
            );
        }

        tracing::debug!("Compiled Rhai plugin '{}' ({:?})", name, capabilities);
        Ok(plugin)
    }

    fn call_sync(&self, func: &str, args: impl FuncArgs) -> anyhow::Result<Dynamic> {
        call_script(&self.engine, &self.ast, func, args)
    }

    /// Run a hook on the blocking pool.
    async fn call<A>(&self, func: &'static str, args: A) -> anyhow::Result<Dynamic>
    where
        A: FuncArgs + Send + 'static,
    {
        let engine = self.engine.clone();
        let ast = self.ast.clone();
        tokio::task::spawn_blocking(move || call_script(&engine, &ast, func, args))
            .await
            .map_err(|e| anyhow::anyhow!("{func} panicked: {e}"))?
    }

    fn command_spec(&self, block: Dynamic) -> anyhow::Result<CommandSpec> {
        let block: CommandBlock = serde_json::from_value(dynamic_to_json(&block))
            .with_context(|| format!("script '{}' returned an invalid command block", self.name))?;

        let mut spec = CommandSpec::new(self.command_callback(&block.execute)?);
        spec.description = block.description;
        spec.example_usage = block.example_usage;
        spec.options = block.options;
        for sub in block.sub_commands {
            let mut sc = SubCommand::new(sub.name, self.command_callback(&sub.execute)?);
            sc.description = sub.description;
            sc.example_usage = sub.example_usage;
            spec.sub_commands.push(sc);
        }
        Ok(spec)
    }

    /// Wrap script function `func(log, options, unused, args)` as a callback.
    fn command_callback(&self, func: &str) -> anyhow::Result<CommandCallback> {
        if !has_fn(&self.ast, func, 4) {
            anyhow::bail!(
                "script '{}' has no function {func}(log, options, unused, args)",
                self.name
            );
        }
        let engine = self.engine.clone();
        let ast = self.ast.clone();
        let func = func.to_string();

        Ok(callback(move |ctx| {
            let mut options = rhai::Map::new();
            for opt in ctx.options {
                options.insert(opt.spec.name.as_str().into(), option_to_dynamic(&opt.value));
            }
            let unused: rhai::Array = ctx.unused.iter().cloned().map(Dynamic::from).collect();
            let args: rhai::Array = ctx.args.iter().cloned().map(Dynamic::from).collect();

            call_script(
                &engine,
                &ast,
                &func,
                (
                    Dynamic::from(ScriptLog(ctx.log.clone())),
                    Dynamic::from_map(options),
                    Dynamic::from_array(unused),
                    Dynamic::from_array(args),
                ),
            )
            .map(|_| CommandFlow::Continue)
        }))
    }
}

#[async_trait]
impl PluginHandler for ScriptPlugin {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn on_request(&self, ctx: RequestContext, log: PluginLog) -> anyhow::Result<()> {
        self.call(
            "on_request",
            (request_to_dynamic(&ctx), Dynamic::from(ScriptLog(log))),
        )
        .await
        .map(drop)
    }

    async fn on_load(&self, log: PluginLog, ctx: LoadContext) -> anyhow::Result<()> {
        if !self.capabilities.on_load {
            return Ok(());
        }
        let mut map = rhai::Map::new();
        map.insert("plugin_id".into(), Dynamic::from(ctx.plugin_id));
        map.insert(
            "plugin_dir".into(),
            Dynamic::from(ctx.plugin_dir.display().to_string()),
        );
        self.call("on_load", (Dynamic::from(ScriptLog(log)), Dynamic::from_map(map)))
            .await
            .map(drop)
    }

    async fn on_unload(&self, log: PluginLog) -> anyhow::Result<()> {
        if !self.capabilities.on_unload {
            return Ok(());
        }
        self.call("on_unload", (Dynamic::from(ScriptLog(log)),))
            .await
            .map(drop)
    }

    fn command(&self) -> Option<CommandSpec> {
        self.command.clone()
    }

    fn scripts(&self) -> Option<ScriptPanel> {
        self.scripts.clone()
    }

    async fn trigger(
        &self,
        channel: &str,
        log: PluginLog,
        ctx: RequestContext,
    ) -> anyhow::Result<serde_json::Value> {
        if !has_fn(&self.ast, "trigger", 3) {
            anyhow::bail!("script '{}' has no trigger(channel, log, ctx)", self.name);
        }
        let result = self
            .call(
                "trigger",
                (
                    Dynamic::from(channel.to_string()),
                    Dynamic::from(ScriptLog(log)),
                    request_to_dynamic(&ctx),
                ),
            )
            .await?;
        Ok(dynamic_to_json(&result))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn option_to_dynamic(value: &OptionValue) -> Dynamic {
    match value {
        OptionValue::Bool(b) => Dynamic::from_bool(*b),
        OptionValue::Number(n) => Dynamic::from_float(*n),
        OptionValue::Str(s) => Dynamic::from(s.clone()),
    }
}

fn call_script(
    engine: &Engine,
    ast: &AST,
    func: &str,
    args: impl FuncArgs,
) -> anyhow::Result<Dynamic> {
    // Top-level statements already ran at import.
    let options = CallFnOptions::new().eval_ast(false);
    engine
        .call_fn_with_options::<Dynamic>(options, &mut Scope::new(), ast, func, args)
        .map_err(|e| anyhow::anyhow!("{func}: {e}"))
}

fn has_fn(ast: &AST, name: &str, arity: usize) -> bool {
    ast.iter_functions()
        .any(|f| f.name == name && f.params.len() == arity)
}

/// `ctx` for `on_request` and `trigger`: `site`, `data` and `utils`.
fn request_to_dynamic(ctx: &RequestContext) -> Dynamic {
    let mut map = rhai::Map::new();
    map.insert(
        "site".into(),
        json_to_dynamic(&serde_json::to_value(&ctx.site).unwrap_or_default()),
    );
    map.insert(
        "data".into(),
        json_to_dynamic(&serde_json::to_value(&ctx.data).unwrap_or_default()),
    );
    map.insert("utils".into(), Dynamic::from(ScriptUtils(ctx.utils.clone())));
    Dynamic::from_map(map)
}

/// Convert a serde_json::Value to a Rhai Dynamic.
pub fn json_to_dynamic(value: &serde_json::Value) -> Dynamic {
    match value {
        serde_json::Value::Null => Dynamic::UNIT,
        serde_json::Value::Bool(b) => Dynamic::from(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Dynamic::from(i)
            } else if let Some(f) = n.as_f64() {
                Dynamic::from(f)
            } else {
                Dynamic::UNIT
            }
        }
        serde_json::Value::String(s) => Dynamic::from(s.clone()),
        serde_json::Value::Array(arr) => {
            let rhai_arr: rhai::Array = arr.iter().map(json_to_dynamic).collect();
            Dynamic::from_array(rhai_arr)
        }
        serde_json::Value::Object(obj) => {
            let mut map = rhai::Map::new();
            for (k, v) in obj {
                map.insert(k.as_str().into(), json_to_dynamic(v));
            }
            Dynamic::from_map(map)
        }
    }
}

/// Convert a Rhai Dynamic back to JSON. Function pointers become their name.
pub fn dynamic_to_json(value: &Dynamic) -> serde_json::Value {
    use serde_json::Value;

    if value.is_unit() {
        return Value::Null;
    }
    if let Ok(b) = value.as_bool() {
        return Value::Bool(b);
    }
    if let Ok(i) = value.as_int() {
        return Value::from(i);
    }
    if let Ok(f) = value.as_float() {
        return serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null);
    }
    if let Ok(c) = value.as_char() {
        return Value::String(c.to_string());
    }
    if let Some(s) = value.clone().try_cast::<rhai::ImmutableString>() {
        return Value::String(s.to_string());
    }
    if let Some(arr) = value.clone().try_cast::<rhai::Array>() {
        return Value::Array(arr.iter().map(dynamic_to_json).collect());
    }
    if let Some(map) = value.clone().try_cast::<rhai::Map>() {
        return Value::Object(
            map.iter()
                .map(|(k, v)| (k.to_string(), dynamic_to_json(v)))
                .collect(),
        );
    }
    if let Some(blob) = value.clone().try_cast::<rhai::Blob>() {
        return Value::Array(blob.into_iter().map(Value::from).collect());
    }
    if let Some(f) = value.clone().try_cast::<FnPtr>() {
        return Value::String(f.fn_name().to_string());
    }
    Value::String(value.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
