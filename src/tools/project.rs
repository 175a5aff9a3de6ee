//! project 操作：创建、打开、列出项目

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::OpError;
use crate::platform::project as marks;
use crate::session::{SessionManager, UiSession};
use crate::tools::args::{resolve_project, AuthArgs};
use crate::tools::{FnTool, Tool};
use crate::verification::VerificationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProjectAction {
    Create,
    Open,
    List,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectArgs {
    pub action: ProjectAction,
    /// create 时必填
    pub name: Option<String>,
    /// create 时的项目类型，默认 formal
    pub project_type: Option<VerificationKind>,
    pub description: Option<String>,
    /// open 时使用；缺省用当前项目
    pub project_id: Option<String>,
    #[serde(flatten)]
    pub auth: AuthArgs,
}

pub async fn manage_project(session: &SessionManager, args: ProjectArgs) -> Result<Value, OpError> {
    let creds = args.auth.credentials();
    match args.action {
        ProjectAction::Create => {
            let name = args
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| OpError::Validation(vec!["name is required to create a project".to_string()]))?
                .to_string();
            let kind = args.project_type.unwrap_or(VerificationKind::Formal);
            let ui = session.acquire(creds.as_ref()).await?;
            create(&ui, &name, kind, args.description.as_deref()).await
        }
        ProjectAction::Open => {
            let id = resolve_project(session, args.project_id)?;
            let ui = session.acquire(creds.as_ref()).await?;
            ui.goto(&ui.routes().project(&id)).await?;
            ui.element(marks::VIEW, "project view").await?;
            session.set_current_project(Some(id.clone()));
            Ok(json!({
                "projectId": id,
                "url": ui.current_url().await?,
            }))
        }
        ProjectAction::List => {
            let ui = session.acquire(creds.as_ref()).await?;
            ui.goto(&ui.routes().projects()).await?;
            ui.element(marks::TABLE, "project list").await?;
            let projects = match ui.driver().evaluate(marks::LIST_SCRIPT).await? {
                Value::Array(items) => items,
                _ => Vec::new(),
            };
            Ok(json!({
                "count": projects.len(),
                "projects": projects,
            }))
        }
    }
}

async fn create(
    ui: &UiSession<'_>,
    name: &str,
    kind: VerificationKind,
    description: Option<&str>,
) -> Result<Value, OpError> {
    let driver = ui.driver();
    ui.goto(&ui.routes().new_project()).await?;

    let name_input = ui.element(marks::NAME, "project name input").await?;
    driver.type_text(&name_input, name).await?;

    let type_select = ui.element(marks::TYPE, "project type selector").await?;
    driver.select_option(&type_select, kind.as_str()).await?;

    if let Some(desc) = description.filter(|d| !d.trim().is_empty()) {
        let input = ui.element(marks::DESCRIPTION, "project description input").await?;
        driver.type_text(&input, desc).await?;
    }

    let submit = ui.element(marks::SUBMIT, "create project button").await?;
    driver.click(&submit).await?;
    ui.element(marks::CREATED, "project creation confirmation").await?;

    let url = ui.current_url().await?;
    let project_id = match driver.evaluate(marks::READ_ID_SCRIPT).await? {
        Value::String(id) if !id.trim().is_empty() => Some(id.trim().to_string()),
        _ => project_id_from_url(&url),
    }
    .ok_or_else(|| OpError::ElementNotFound("new project id".to_string()))?;

    ui.manager().set_current_project(Some(project_id.clone()));
    tracing::info!(project_id = %project_id, name, kind = kind.as_str(), "project created");

    Ok(json!({
        "projectId": project_id,
        "name": name,
        "projectType": kind,
        "url": url,
    }))
}

/// .../projects/<id>[/...] → id（路径段已转义，这里解码）
fn project_id_from_url(url: &str) -> Option<String> {
    let rest = url.split("/projects/").nth(1)?;
    let raw = rest.split(['/', '?', '#']).next()?;
    let id = urlencoding::decode(raw).ok()?.into_owned();
    (!id.is_empty() && id != "new").then_some(id)
}

pub fn tool(session: Arc<SessionManager>) -> impl Tool {
    FnTool::new(
        "project",
        "Manage EDA projects. action: create (name, projectType, description) | open (projectId) | list.",
        move |args: ProjectArgs| {
            let session = session.clone();
            async move { manage_project(&session, args).await }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_id_from_url() {
        assert_eq!(
            project_id_from_url("https://eda.test/projects/p42/overview"),
            Some("p42".to_string())
        );
        assert_eq!(project_id_from_url("https://eda.test/projects/p7?tab=files"), Some("p7".to_string()));
        assert_eq!(project_id_from_url("https://eda.test/projects/new"), None);
        assert_eq!(project_id_from_url("https://eda.test/"), None);
        assert_eq!(
            project_id_from_url("https://eda.test/projects/team%2Fcpu/overview"),
            Some("team/cpu".to_string())
        );
    }
}
