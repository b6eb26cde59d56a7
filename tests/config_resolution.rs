//! Library-level tests: parse, validate and resolve a configuration, then run
//! its tasks without a terminal

use cmdx::config::{parse_config, resolve_config, validate_config, Config, Prompt, PromptKind};
use cmdx::error::{BindingError, CmdxError, PromptError};
use cmdx::runner::{AwsCliClient, CancelToken, Context, FlagSource, Prompter, TaskRunner, Value};
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

/// Answers prompts from a fixed table keyed by prompt message
struct ScriptedPrompter(HashMap<String, Value>);

impl Prompter for ScriptedPrompter {
    fn ask(&self, _kind: PromptKind, prompt: &Prompt) -> Result<Value, PromptError> {
        self.0.get(&prompt.message).cloned().ok_or(PromptError::Cancelled)
    }
}

/// Explicitly given flags; defaults are applied by the command-line layer
#[derive(Default)]
struct Flags(HashMap<String, String>);

impl FlagSource for Flags {
    fn is_set(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    fn bool_value(&self, name: &str) -> bool {
        self.0.get(name).map(|v| v == "true").unwrap_or(false)
    }

    fn string_value(&self, name: &str) -> String {
        self.0.get(name).cloned().unwrap_or_default()
    }
}

fn load(yaml: &str) -> Config {
    let config = parse_config(yaml).unwrap();
    validate_config(&config).unwrap();
    resolve_config(&config).unwrap()
}

fn runner(dir: &TempDir, answers: &[(&str, Value)]) -> TaskRunner<ScriptedPrompter, AwsCliClient> {
    let answers = answers
        .iter()
        .map(|(message, value)| (message.to_string(), value.clone()))
        .collect();
    TaskRunner::with_parts(
        Context::new(dir.path().to_path_buf()).with_quiet(Some(true)),
        ScriptedPrompter(answers),
        AwsCliClient,
    )
}

const YAML: &str = r#"
environment:
  GREETING: hello
script_envs: ["CMDX_IT_{{ name }}"]
tasks:
- name: release
  flags:
  - name: channel
    default: beta
    validate:
    - enum: [beta, stable]
  - name: notes
    prompt:
      type: input
      message: release notes?
  args:
  - name: version
    required: true
    validate:
    - regexp: '^v\d+\.\d+$'
  environment:
    TARGET: prod
  script: |
    echo "$GREETING {{ version }} {{ channel }} {{ notes }} $TARGET $CMDX_IT_CHANNEL" > out.txt
- name: group
  tasks:
  - name: leaf
    script: "echo {{ _builtin.args_string }} > leaf.txt"
"#;

#[tokio::test]
async fn test_run_resolved_task() {
    let config = load(YAML);
    let dir = TempDir::new().unwrap();
    let runner = runner(&dir, &[("release notes?", Value::from("first"))]);

    let task = &config.tasks[0];
    assert_eq!(task.flags[0].script_envs, vec!["CMDX_IT_CHANNEL"]);

    let flags = Flags([("channel".to_string(), "stable".to_string())].into());
    runner
        .run(task, &flags, &["v1.2".to_string()], &mut CancelToken::never())
        .await
        .unwrap();

    let out = fs::read_to_string(dir.path().join("out.txt")).unwrap();
    assert_eq!(out, "hello v1.2 stable first prod stable\n");
}

#[tokio::test]
async fn test_invalid_values_stop_the_task() {
    let config = load(YAML);
    let dir = TempDir::new().unwrap();
    let runner = runner(&dir, &[("release notes?", Value::from(""))]);
    let task = &config.tasks[0];

    let err = runner
        .run(task, &Flags::default(), &["1.2".to_string()], &mut CancelToken::never())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CmdxError::Binding(BindingError::Invalid { ref name, .. }) if name == "version"
    ));

    let flags = Flags([("channel".to_string(), "nightly".to_string())].into());
    let err = runner
        .run(task, &flags, &["v1.2".to_string()], &mut CancelToken::never())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CmdxError::Binding(BindingError::Invalid { ref name, .. }) if name == "channel"
    ));

    assert!(!dir.path().join("out.txt").exists());
}

#[tokio::test]
async fn test_nested_task_sees_extra_args() {
    let config = load(YAML);
    let dir = TempDir::new().unwrap();
    let runner = runner(&dir, &[]);

    let leaf = &config.tasks[1].tasks[0];
    let positional = vec!["a".to_string(), "b c".to_string()];
    runner
        .run(leaf, &Flags::default(), &positional, &mut CancelToken::never())
        .await
        .unwrap();

    let out = fs::read_to_string(dir.path().join("leaf.txt")).unwrap();
    assert_eq!(out, "a b c\n");
}
