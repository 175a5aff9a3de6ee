//! EDA 平台的页面路由与 UI 标记
//!
//! 每组 selector 按顺序尝试，第一个命中的生效；平台改版时只需改这里。

/// 路径段转义：id 里的 / ? # 等不能改变目标页面
fn segment(id: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(id)
}

/// 平台 URL 路由
#[derive(Debug, Clone)]
pub struct Routes {
    base: String,
}

impl Routes {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn landing(&self) -> String {
        format!("{}/", self.base)
    }

    pub fn login(&self) -> String {
        format!("{}/login", self.base)
    }

    pub fn projects(&self) -> String {
        format!("{}/projects", self.base)
    }

    pub fn new_project(&self) -> String {
        format!("{}/projects/new", self.base)
    }

    pub fn project(&self, id: &str) -> String {
        format!("{}/projects/{}", self.base, segment(id))
    }

    pub fn files(&self, id: &str) -> String {
        format!("{}/projects/{}/files", self.base, segment(id))
    }

    pub fn verification(&self, id: &str) -> String {
        format!("{}/projects/{}/verification", self.base, segment(id))
    }

    pub fn results(&self, id: &str) -> String {
        format!("{}/projects/{}/results", self.base, segment(id))
    }

    pub fn settings(&self) -> String {
        format!("{}/settings", self.base)
    }

    /// 站内路径（必须以 / 开头）
    pub fn path(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

pub mod login {
    pub const USERNAME: &[&str] = &["input[name='username']", "input[type='email']", "#username"];
    pub const PASSWORD: &[&str] = &["input[name='password']", "input[type='password']"];
    pub const SUBMIT: &[&str] = &["button[type='submit']", "#login-button"];
    /// 任一出现即视为登录成功
    pub const SUCCESS: &[&str] = &[
        ".user-menu",
        "[data-testid='user-avatar']",
        "a[href*='logout']",
        ".dashboard",
    ];
}

pub mod project {
    pub const NAME: &[&str] = &["input[name='project-name']", "#project-name"];
    pub const TYPE: &[&str] = &["select[name='project-type']", "#project-type"];
    pub const DESCRIPTION: &[&str] = &["textarea[name='description']", "#project-description"];
    pub const SUBMIT: &[&str] = &["button[type='submit']", "#create-project"];
    pub const CREATED: &[&str] = &[".project-created", "[data-project-id]"];
    pub const VIEW: &[&str] = &[".project-view", "[data-project-id]"];
    pub const TABLE: &[&str] = &[".project-list", "table.projects"];

    pub const READ_ID_SCRIPT: &str = r#"(function() {
        const el = document.querySelector('[data-project-id]');
        return el ? el.getAttribute('data-project-id') : null;
    })()"#;

    pub const LIST_SCRIPT: &str = r#"(function() {
        return Array.from(document.querySelectorAll('[data-project-row]')).map(row => ({
            id: row.getAttribute('data-project-row'),
            name: (row.querySelector('.project-name') || {}).textContent || '',
            type: (row.querySelector('.project-type') || {}).textContent || ''
        }));
    })()"#;
}

pub mod upload {
    pub const FILE_INPUT: &[&str] = &["input[type='file']"];
    pub const FILE_TYPE: &[&str] = &["select[name='file-type']", "#file-type"];
    pub const SUBMIT: &[&str] = &["button.upload-submit", "#upload-button"];
    pub const SUCCESS: &[&str] = &[".upload-success", "[data-upload-status='done']"];
}

pub mod verification {
    pub const TYPE: &[&str] = &["select[name='verification-type']", "#verification-type"];
    pub const TIMEOUT: &[&str] = &["input[name='timeout']", "#verification-timeout"];
    pub const DEPTH: &[&str] = &["input[name='depth']", "#verification-depth"];
    pub const PROPERTIES: &[&str] = &["textarea[name='properties']", "#verification-properties"];
    pub const RUN: &[&str] = &["button#run-verification", "button[data-action='run']"];
    pub const RUNNING: &[&str] = &[".verification-running", "[data-status='running']"];
    pub const COMPLETE: &[&str] = &[".verification-complete", "[data-status='complete']"];
    pub const RESULTS_VIEW: &[&str] = &[".verification-results", ".results-panel"];

    /// 读出结果区的原始快照；缺失的元素返回 null，由 Rust 侧兜底
    pub const EXTRACT_SCRIPT: &str = r#"(function() {
        const text = sel => { const el = document.querySelector(sel); return el ? el.textContent : null; };
        const status = document.querySelector('.verification-status, [data-result]');
        let passed = null;
        if (status) {
            const r = status.getAttribute('data-result');
            passed = r ? r === 'pass' : /\bpass(ed)?\b/i.test(status.textContent) && !/fail/i.test(status.textContent);
        }
        const violations = Array.from(document.querySelectorAll('.violation, [data-violation]')).map(v => ({
            type: v.getAttribute('data-type'),
            message: (v.querySelector('.violation-message') || {}).textContent || null,
            location: (v.querySelector('.violation-location') || {}).textContent || null,
            severity: v.getAttribute('data-severity')
        }));
        return {
            passed: passed,
            violations: violations,
            statistics: {
                totalChecks: text('.stat-total'),
                passed: text('.stat-passed'),
                failed: text('.stat-failed'),
                warnings: text('.stat-warnings')
            }
        };
    })()"#;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_strip_trailing_slash() {
        let r = Routes::new("https://eda.test/");
        assert_eq!(r.landing(), "https://eda.test/");
        assert_eq!(r.verification("p1"), "https://eda.test/projects/p1/verification");
        assert_eq!(r.path("/help"), "https://eda.test/help");
    }

    #[test]
    fn test_project_id_is_one_path_segment() {
        let r = Routes::new("https://eda.test");
        assert_eq!(r.project("p-1_a"), "https://eda.test/projects/p-1_a");
        assert_eq!(
            r.project("../../admin?x=1#"),
            "https://eda.test/projects/..%2F..%2Fadmin%3Fx%3D1%23"
        );
        assert_eq!(r.results("a/b"), "https://eda.test/projects/a%2Fb/results");
    }
}
