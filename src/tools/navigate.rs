//! navigate 操作：打开平台内的页面

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::OpError;
use crate::session::SessionManager;
use crate::tools::args::{resolve_project, AuthArgs};
use crate::tools::{FnTool, Tool};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NavigationTarget {
    #[default]
    Home,
    Projects,
    Project,
    Verification,
    Results,
    Settings,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NavigateArgs {
    /// 目标页面，默认 home
    pub target: Option<NavigationTarget>,
    /// project / verification / results 需要；缺省用当前项目
    pub project_id: Option<String>,
    /// 站内路径（以 / 开头），优先于 target
    pub path: Option<String>,
    #[serde(flatten)]
    pub auth: AuthArgs,
}

pub async fn navigate(session: &SessionManager, args: NavigateArgs) -> Result<Value, OpError> {
    let routes = &session.settings().routes;
    let target = args.target.unwrap_or_default();

    let (url, project) = match args.path.as_deref() {
        Some(path) if !path.starts_with('/') => {
            return Err(OpError::Validation(vec![format!(
                "path must start with '/': {}",
                path
            )]))
        }
        Some(path) => (routes.path(path), None),
        None => match target {
            NavigationTarget::Home => (routes.landing(), None),
            NavigationTarget::Projects => (routes.projects(), None),
            NavigationTarget::Settings => (routes.settings(), None),
            NavigationTarget::Project => {
                let id = resolve_project(session, args.project_id.clone())?;
                (routes.project(&id), Some(id))
            }
            NavigationTarget::Verification => {
                let id = resolve_project(session, args.project_id.clone())?;
                (routes.verification(&id), Some(id))
            }
            NavigationTarget::Results => {
                let id = resolve_project(session, args.project_id.clone())?;
                (routes.results(&id), Some(id))
            }
        },
    };

    let creds = args.auth.credentials();
    let ui = session.acquire(creds.as_ref()).await?;
    ui.goto(&url).await?;
    let current = ui.current_url().await?;
    if project.is_some() {
        session.set_current_project(project.clone());
    }

    Ok(json!({
        "url": current,
        "projectId": project,
    }))
}

pub fn tool(session: Arc<SessionManager>) -> impl Tool {
    FnTool::new(
        "navigate",
        "Open a page of the EDA platform. target: home | projects | project | verification | results | settings; \
         or give an in-site path such as /projects/p1/files.",
        move |args: NavigateArgs| {
            let session = session.clone();
            async move { navigate(&session, args).await }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::browser::{FakeDriver, FakeLauncher};
    use crate::config::Credentials;
    use crate::session::SessionSettings;

    fn session() -> (Arc<SessionManager>, Arc<FakeDriver>) {
        let driver = Arc::new(FakeDriver::new());
        driver.page("/login", &["input[name='username']", "input[name='password']", "button[type='submit']"]);
        driver.on_click("button[type='submit']", &[".user-menu"]);
        let settings = SessionSettings::new("https://eda.test")
            .with_env_credentials(Some(Credentials::new("alice", "secret")))
            .with_login_timeout(Duration::from_millis(300))
            .with_poll_interval(Duration::from_millis(20));
        let launcher = Arc::new(FakeLauncher::new(driver.clone()));
        (Arc::new(SessionManager::new(launcher, settings)), driver)
    }

    fn args(target: Option<NavigationTarget>, project_id: Option<&str>, path: Option<&str>) -> NavigateArgs {
        NavigateArgs {
            target,
            project_id: project_id.map(str::to_string),
            path: path.map(str::to_string),
            auth: AuthArgs::default(),
        }
    }

    #[tokio::test]
    async fn test_relative_path_rejected_before_browser() {
        let (session, driver) = session();
        let err = navigate(&session, args(None, None, Some("projects"))).await.unwrap_err();
        assert!(matches!(err, OpError::Validation(_)));
        assert_eq!(driver.count_calls("open:"), 0);
    }

    #[tokio::test]
    async fn test_project_target_needs_id() {
        let (session, _) = session();
        let err = navigate(&session, args(Some(NavigationTarget::Results), None, None))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("projectId"));
    }

    #[tokio::test]
    async fn test_project_id_cannot_escape_project_path() {
        let (session, driver) = session();
        let data = navigate(
            &session,
            args(Some(NavigationTarget::Project), Some("../../admin?x=1#"), None),
        )
        .await
        .unwrap();
        assert_eq!(data["url"], "https://eda.test/projects/..%2F..%2Fadmin%3Fx%3D1%23");
        assert_eq!(driver.count_calls("open:https://eda.test/projects/../"), 0);
    }

    #[tokio::test]
    async fn test_project_target_sets_current_project() {
        let (session, driver) = session();
        let data = navigate(&session, args(Some(NavigationTarget::Verification), Some("p5"), None))
            .await
            .unwrap();
        assert_eq!(data["url"], "https://eda.test/projects/p5/verification");
        assert_eq!(data["projectId"], "p5");
        assert_eq!(session.current_project(), Some("p5".to_string()));
        assert_eq!(driver.count_calls("open:https://eda.test/projects/p5/verification"), 1);

        // path 优先于 target
        let data = navigate(&session, args(Some(NavigationTarget::Settings), None, Some("/help")))
            .await
            .unwrap();
        assert_eq!(data["url"], "https://eda.test/help");
        assert_eq!(data["projectId"], Value::Null);
    }
}
