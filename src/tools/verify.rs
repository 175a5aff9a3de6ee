//! run_verification / get_results 操作：VerificationRunner 的分发入口

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::OpError;
use crate::tools::args::{resolve_project, AuthArgs};
use crate::tools::{FnTool, Tool};
use crate::verification::{VerificationKind, VerificationOptions, VerificationResult, VerificationRunner};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RunVerificationArgs {
    /// 缺省用当前项目
    pub project_id: Option<String>,
    pub verification_type: VerificationKind,
    pub options: Option<VerificationOptions>,
    #[serde(flatten)]
    pub auth: AuthArgs,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetResultsArgs {
    /// 缺省用当前项目
    pub project_id: Option<String>,
    #[serde(flatten)]
    pub auth: AuthArgs,
}

fn report(project_id: &str, kind: Option<VerificationKind>, result: VerificationResult) -> Value {
    json!({
        "projectId": project_id,
        "verificationType": kind,
        "passed": result.passed,
        "violations": result.violations,
        "statistics": result.statistics,
    })
}

pub async fn run_verification(runner: &VerificationRunner, args: RunVerificationArgs) -> Result<Value, OpError> {
    let project_id = resolve_project(runner.session(), args.project_id)?;
    let options = args.options.unwrap_or_default();
    let creds = args.auth.credentials();
    let result = runner
        .run(&project_id, args.verification_type, &options, creds.as_ref())
        .await?;
    Ok(report(&project_id, Some(args.verification_type), result))
}

pub async fn get_results(runner: &VerificationRunner, args: GetResultsArgs) -> Result<Value, OpError> {
    let project_id = resolve_project(runner.session(), args.project_id)?;
    let creds = args.auth.credentials();
    let result = runner.latest_results(&project_id, creds.as_ref()).await?;
    Ok(report(&project_id, None, result))
}

pub fn tool(runner: Arc<VerificationRunner>) -> impl Tool {
    FnTool::new(
        "run_verification",
        "Run a verification on a project and wait for it to finish. verificationType: formal | equivalence | power | \
         security | fpga. options: {timeout (seconds, default 300), depth, properties}.",
        move |args: RunVerificationArgs| {
            let runner = runner.clone();
            async move { run_verification(&runner, args).await }
        },
    )
}

pub fn results_tool(runner: Arc<VerificationRunner>) -> impl Tool {
    FnTool::new(
        "get_results",
        "Read the latest verification results of a project: pass/fail, violations and statistics.",
        move |args: GetResultsArgs| {
            let runner = runner.clone();
            async move { get_results(&runner, args).await }
        },
    )
}
