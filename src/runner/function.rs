//! Managed-function invocation for `type: lambda` tasks
//!
//! Production code shells out to the AWS CLI through [`AwsCliClient`]; tests
//! provide their own [`FunctionClient`] that records requests instead.
//!
//! The function's response payload goes to stdout. When a log type is set,
//! the tail of the execution log is decoded and written to stderr.

use crate::config::types::{PayloadParam, Task};
use crate::error::{ExecutionError, ExecutionResult, TemplateResult};
use crate::runner::signal::CancelToken;
use crate::runner::template;
use crate::runner::vars::Variables;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::fs;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info};

/// One function invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRequest {
    pub function_name: String,
    /// JSON object built from the rendered payload parameters
    pub payload: String,
    pub invocation_type: String,
    pub log_type: String,
    pub region: String,
    pub profile: String,
}

impl FunctionRequest {
    /// Build the request for a task, rendering its payload against `vars`
    pub fn from_task(task: &Task, vars: &Variables) -> TemplateResult<Self> {
        Ok(FunctionRequest {
            function_name: task.function_name.clone(),
            payload: build_payload(&task.payload, vars)?,
            invocation_type: task.invocation_type.clone(),
            log_type: task.log_type.clone(),
            region: task.region.clone(),
            profile: task.profile.clone(),
        })
    }
}

/// Render every payload parameter and serialize them as a JSON object
pub fn build_payload(params: &[PayloadParam], vars: &Variables) -> TemplateResult<String> {
    let mut payload = serde_json::Map::with_capacity(params.len());
    for param in params {
        let value = template::render(&param.value, vars)?;
        payload.insert(param.name.clone(), serde_json::Value::String(value));
    }
    Ok(serde_json::Value::Object(payload).to_string())
}

/// Invokes managed functions
pub trait FunctionClient: Send + Sync {
    fn invoke<'a>(
        &'a self,
        request: &'a FunctionRequest,
        cancel: &'a mut CancelToken,
    ) -> Pin<Box<dyn Future<Output = ExecutionResult<()>> + Send + 'a>>;
}

/// Invokes functions with `aws lambda invoke`
#[derive(Debug, Default, Clone)]
pub struct AwsCliClient;

impl AwsCliClient {
    /// The CLI writes the payload to `outfile` and the invocation metadata to stdout
    fn command(request: &FunctionRequest, outfile: &Path) -> Command {
        let mut command = Command::new("aws");
        command
            .args(["lambda", "invoke", "--cli-binary-format", "raw-in-base64-out"])
            .args(["--output", "json"])
            .arg("--function-name")
            .arg(&request.function_name)
            .arg("--payload")
            .arg(&request.payload);

        for (option, value) in [
            ("--invocation-type", &request.invocation_type),
            ("--log-type", &request.log_type),
            ("--region", &request.region),
            ("--profile", &request.profile),
        ] {
            if !value.is_empty() {
                command.arg(option).arg(value);
            }
        }

        command
            .arg(outfile)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        command
    }
}

impl FunctionClient for AwsCliClient {
    fn invoke<'a>(
        &'a self,
        request: &'a FunctionRequest,
        cancel: &'a mut CancelToken,
    ) -> Pin<Box<dyn Future<Output = ExecutionResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let outfile = NamedTempFile::new().map_err(ExecutionError::Response)?;
            let child = Self::command(request, outfile.path())
                .spawn()
                .map_err(|source| ExecutionError::Spawn {
                    shell: "aws".to_string(),
                    source,
                })?;
            debug!(function = %request.function_name, "invoking function");

            // Dropping the output future kills the CLI
            let output = tokio::select! {
                res = child.wait_with_output() => res.map_err(ExecutionError::Wait)?,
                _ = cancel.cancelled() => {
                    info!(
                        function = %request.function_name,
                        "cancellation requested, stopping invocation"
                    );
                    return Err(ExecutionError::Interrupted { exit: None });
                }
            };

            if !output.status.success() {
                return Err(ExecutionError::Function(format!(
                    "aws lambda invoke {} exited with {}",
                    request.function_name, output.status
                )));
            }

            let payload = fs::read_to_string(outfile.path()).map_err(ExecutionError::Response)?;
            if !payload.is_empty() {
                println!("{}", payload.trim_end());
            }
            if !request.log_type.is_empty() {
                if let Some(log) = decode_log_result(&output.stdout)? {
                    eprintln!("{}", log.trim_end());
                }
            }
            Ok(())
        })
    }
}

/// Invocation metadata printed by `aws lambda invoke`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InvokeMetadata {
    #[serde(default)]
    log_result: Option<String>,
}

/// Decode the base64 `LogResult` of the invocation metadata, if present
fn decode_log_result(metadata: &[u8]) -> ExecutionResult<Option<String>> {
    if metadata.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let metadata: InvokeMetadata = serde_json::from_slice(metadata)
        .map_err(|e| ExecutionError::Function(format!("unexpected invocation metadata: {}", e)))?;
    let Some(encoded) = metadata.log_result else {
        return Ok(None);
    };
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|e| ExecutionError::Function(format!("failed to decode the log result: {}", e)))?;
    Ok(Some(String::from_utf8_lossy(&decoded).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::vars::Value;

    #[test]
    fn test_build_payload() {
        let mut vars = Variables::new();
        vars.insert("env", Value::from("prod"));
        vars.insert("force", Value::from(true));

        let params = vec![
            PayloadParam {
                name: "target".to_string(),
                value: "{{ env }}".to_string(),
            },
            PayloadParam {
                name: "force".to_string(),
                value: "{{ force }}".to_string(),
            },
        ];
        let payload = build_payload(&params, &vars).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(parsed["target"], "prod");
        assert_eq!(parsed["force"], "true");
    }

    #[test]
    fn test_build_payload_template_error() {
        let params = vec![PayloadParam {
            name: "broken".to_string(),
            value: "{{ env".to_string(),
        }];
        let err = build_payload(&params, &Variables::new()).unwrap_err();
        assert_eq!(err.template, "{{ env");
    }

    #[test]
    fn test_request_from_task() {
        let task = Task {
            name: "invoke".to_string(),
            function_name: "hello".to_string(),
            region: "us-east-1".to_string(),
            ..Task::default()
        };
        let request = FunctionRequest::from_task(&task, &Variables::new()).unwrap();
        assert_eq!(request.function_name, "hello");
        assert_eq!(request.payload, "{}");
        assert_eq!(request.region, "us-east-1");
    }

    #[test]
    fn test_aws_cli_arguments() {
        let request = FunctionRequest {
            function_name: "hello".to_string(),
            payload: "{}".to_string(),
            invocation_type: String::new(),
            log_type: "Tail".to_string(),
            region: "eu-west-1".to_string(),
            profile: String::new(),
        };
        let command = AwsCliClient::command(&request, Path::new("/tmp/response.json"));
        let args: Vec<_> = command
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "lambda",
                "invoke",
                "--cli-binary-format",
                "raw-in-base64-out",
                "--output",
                "json",
                "--function-name",
                "hello",
                "--payload",
                "{}",
                "--log-type",
                "Tail",
                "--region",
                "eu-west-1",
                "/tmp/response.json",
            ]
        );
    }

    #[test]
    fn test_decode_log_result() {
        let metadata = br#"{"StatusCode": 200, "LogResult": "aGVsbG8K"}"#;
        assert_eq!(
            decode_log_result(metadata).unwrap().as_deref(),
            Some("hello\n")
        );

        let metadata = br#"{"StatusCode": 202}"#;
        assert_eq!(decode_log_result(metadata).unwrap(), None);
        assert_eq!(decode_log_result(b"\n").unwrap(), None);

        let err = decode_log_result(br#"{"LogResult": "%%%"}"#).unwrap_err();
        assert!(matches!(err, ExecutionError::Function(_)));
    }
}
