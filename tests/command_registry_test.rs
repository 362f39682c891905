// tests/command_registry_test.rs — Integration test: console commands end to end

use std::path::Path;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;

use siterelay::commands::builtin::register_defaults;
use siterelay::commands::{
    callback, CommandError, CommandFlow, CommandRegistry, CommandSpec, OptionSpec, OptionValue,
    Owner, SubCommand,
};
use siterelay::plugins::context::PluginLog;
use siterelay::plugins::{lifecycle, PluginLoader};

fn log(tag: &str) -> PluginLog {
    PluginLog::new(tag, "")
}

fn noop() -> CommandSpec {
    CommandSpec::new(callback(|_| Ok(CommandFlow::Continue)))
}

#[test]
fn test_two_owners_same_name_both_prefixed() {
    let mut r = CommandRegistry::new();
    r.register("dl", Owner::plugin("alpha"), log("alpha"), noop())
        .unwrap();
    r.register("dl", Owner::plugin("beta"), log("beta"), noop())
        .unwrap();

    assert!(r.get("dl").is_none());
    assert_eq!(r.get("alpha:dl").unwrap().owner, Owner::plugin("alpha"));
    assert_eq!(r.get("beta:dl").unwrap().owner, Owner::plugin("beta"));
    assert!(matches!(r.execute("dl"), Err(CommandError::Unknown(_))));
    assert_eq!(r.execute("alpha:dl").unwrap(), CommandFlow::Continue);
}

#[test]
fn test_reserved_names() {
    let mut r = CommandRegistry::new();
    for name in ["exit", "help", "plugin:list", "plugin:ps"] {
        assert!(matches!(
            r.register(name, Owner::plugin("p"), log("p"), noop()),
            Err(CommandError::Reserved(_))
        ));
    }
    register_defaults(&mut r, Arc::default()).unwrap();
    for name in ["exit", "help", "plugin:list", "plugin:ps"] {
        assert!(r
            .register(name, Owner::System, log("server"), noop())
            .is_err());
    }
}

#[test]
fn test_option_values_reach_callback() {
    let seen: Arc<Mutex<Vec<OptionValue>>> = Arc::default();
    let sink = seen.clone();
    let spec = CommandSpec::new(callback(move |ctx| {
        sink.lock().unwrap().push(ctx.option("x").cloned().unwrap());
        Ok(CommandFlow::Continue)
    }))
    .option(OptionSpec::new("x"));

    let mut r = CommandRegistry::new();
    r.register("cmd", Owner::plugin("p"), log("p"), spec).unwrap();
    for line in ["cmd --x=5", "cmd --x=true", "cmd --x=hello", "cmd"] {
        r.execute(line).unwrap();
    }

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            OptionValue::Number(5.0),
            OptionValue::Bool(true),
            OptionValue::Str("hello".into()),
            OptionValue::Bool(false),
        ]
    );
}

#[test]
fn test_subcommand_precedence() {
    let hits: Arc<Mutex<Vec<(String, Vec<String>)>>> = Arc::default();
    let main_hits = hits.clone();
    let sub_hits = hits.clone();

    let spec = CommandSpec::new(callback(move |ctx| {
        main_hits
            .lock()
            .unwrap()
            .push(("main".into(), ctx.unused.to_vec()));
        Ok(CommandFlow::Continue)
    }))
    .option(OptionSpec::new("flag"))
    .sub_command(SubCommand::new(
        "foo",
        callback(move |ctx| {
            assert_eq!(ctx.option("flag"), Some(&OptionValue::Bool(true)));
            sub_hits
                .lock()
                .unwrap()
                .push(("foo".into(), ctx.unused.to_vec()));
            Ok(CommandFlow::Continue)
        }),
    ));

    let mut r = CommandRegistry::new();
    r.register("cmd", Owner::plugin("p"), log("p"), spec).unwrap();
    r.execute("cmd foo --flag").unwrap();
    r.execute("cmd bar --flag").unwrap();

    assert_eq!(
        *hits.lock().unwrap(),
        vec![
            ("foo".to_string(), vec![]),
            ("main".to_string(), vec!["bar".to_string()]),
        ]
    );
}

#[test]
fn test_required_option_without_value_skips_callback() {
    let ran = Arc::new(Mutex::new(false));
    let flag = ran.clone();
    let spec = CommandSpec::new(callback(move |_| {
        *flag.lock().unwrap() = true;
        Ok(CommandFlow::Continue)
    }))
    .option(OptionSpec::new("out").alias("o").required());

    let mut r = CommandRegistry::new();
    r.register("save", Owner::plugin("p"), log("p"), spec).unwrap();

    let err = r.execute("save -o").unwrap_err();
    assert!(err.is_reported());
    assert!(!*ran.lock().unwrap());

    r.execute("save -o=./out").unwrap();
    assert!(*ran.lock().unwrap());
}

fn script_plugin(root: &Path, id: &str, command_name: &str) {
    let dir = root.join(id);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("plugin.json"),
        format!(r#"{{"main": "index.rhai", "commandName": "{command_name}"}}"#),
    )
    .unwrap();
    std::fs::write(
        dir.join("index.rhai"),
        r#"
fn on_request(ctx, log) { }
fn run(log, options, unused, args) {
    log.info("ran with " + args.len() + " tokens");
}
fn command() {
    #{ execute: "run", description: "script command" }
}
"#,
    )
    .unwrap();
}

#[tokio::test]
async fn test_script_commands_through_lifecycle() {
    let tmp = tempfile::tempdir().unwrap();
    script_plugin(tmp.path(), "one", "grab");
    script_plugin(tmp.path(), "two", "grab");
    script_plugin(tmp.path(), "three", "help");

    let catalog = Arc::new(PluginLoader::new(tmp.path()).load());
    assert_eq!(catalog.plugins.len(), 3);

    let mut r = CommandRegistry::new();
    register_defaults(&mut r, catalog.clone()).unwrap();
    lifecycle::start(&catalog.plugins, &mut r).await;

    assert!(r.contains("one:grab"));
    assert!(r.contains("two:grab"));
    assert!(!r.contains("grab"));
    assert_eq!(r.get("help").unwrap().owner, Owner::System);
    assert_eq!(r.command_of("three"), None);

    assert_eq!(r.execute("two:grab a b").unwrap(), CommandFlow::Continue);
    assert_eq!(r.execute("plugin:list").unwrap(), CommandFlow::Continue);
    assert_eq!(r.execute("exit").unwrap(), CommandFlow::Exit);
}
