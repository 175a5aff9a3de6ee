//! upload_file 操作：把本地 HDL / 约束文件上传到项目
//!
//! 本地路径先解析为绝对路径并检查可读，失败直接返回 UploadSourceMissing，不会触发任何导航。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::OpError;
use crate::platform::upload as marks;
use crate::session::SessionManager;
use crate::tools::args::{resolve_project, AuthArgs};
use crate::tools::{FnTool, Tool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Verilog,
    Systemverilog,
    Vhdl,
    Constraints,
    Other,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Verilog => "verilog",
            FileType::Systemverilog => "systemverilog",
            FileType::Vhdl => "vhdl",
            FileType::Constraints => "constraints",
            FileType::Other => "other",
        }
    }

    /// 按扩展名推断
    pub fn infer(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "v" | "vh" => FileType::Verilog,
            "sv" | "svh" => FileType::Systemverilog,
            "vhd" | "vhdl" => FileType::Vhdl,
            "sdc" | "xdc" => FileType::Constraints,
            _ => FileType::Other,
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadArgs {
    /// 本地文件路径，相对路径按当前工作目录解析
    pub file_path: String,
    /// 目标项目；缺省用当前项目
    pub project_id: Option<String>,
    /// 缺省按扩展名推断
    pub file_type: Option<FileType>,
    #[serde(flatten)]
    pub auth: AuthArgs,
}

/// 解析为绝对路径，并确认是存在且可读的普通文件
pub fn resolve_source(raw: &str) -> Result<PathBuf, OpError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(OpError::UploadSourceMissing("empty path".to_string()));
    }
    let path = Path::new(raw);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| OpError::UploadSourceMissing(format!("{}: {}", raw, e)))?
            .join(path)
    };

    match std::fs::metadata(&absolute) {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => {
            return Err(OpError::UploadSourceMissing(format!(
                "{} is not a regular file",
                absolute.display()
            )))
        }
        Err(_) => {
            return Err(OpError::UploadSourceMissing(format!(
                "{} does not exist",
                absolute.display()
            )))
        }
    }
    std::fs::File::open(&absolute).map_err(|e| {
        OpError::UploadSourceMissing(format!("{} is not readable: {}", absolute.display(), e))
    })?;
    Ok(absolute)
}

pub async fn upload_file(session: &SessionManager, args: UploadArgs) -> Result<Value, OpError> {
    let source = resolve_source(&args.file_path)?;
    let project_id = resolve_project(session, args.project_id)?;
    let file_type = args.file_type.unwrap_or_else(|| FileType::infer(&source));
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let creds = args.auth.credentials();
    let ui = session.acquire(creds.as_ref()).await?;
    let driver = ui.driver();
    ui.goto(&ui.routes().files(&project_id)).await?;

    let input = ui.element(marks::FILE_INPUT, "file input").await?;
    driver.upload_file(&input, &source).await?;

    // 文件类型选择框是可选的
    if let Some(select) = ui.find(marks::FILE_TYPE).await? {
        driver.select_option(&select, file_type.as_str()).await?;
    }

    let submit = ui.element(marks::SUBMIT, "upload button").await?;
    driver.click(&submit).await?;
    ui.element(marks::SUCCESS, "upload confirmation").await?;

    session.set_current_project(Some(project_id.clone()));
    tracing::info!(project_id = %project_id, file = %file_name, file_type = file_type.as_str(), "file uploaded");

    Ok(json!({
        "projectId": project_id,
        "fileName": file_name,
        "filePath": source.display().to_string(),
        "fileType": file_type,
    }))
}

pub fn tool(session: Arc<SessionManager>) -> impl Tool {
    FnTool::new(
        "upload_file",
        "Upload a local design or constraint file to a project. fileType: verilog | systemverilog | vhdl | constraints | other \
         (inferred from the extension when omitted).",
        move |args: UploadArgs| {
            let session = session.clone();
            async move { upload_file(&session, args).await }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_file_type() {
        assert_eq!(FileType::infer(Path::new("cpu/alu.v")), FileType::Verilog);
        assert_eq!(FileType::infer(Path::new("top.SV")), FileType::Systemverilog);
        assert_eq!(FileType::infer(Path::new("fifo.vhdl")), FileType::Vhdl);
        assert_eq!(FileType::infer(Path::new("timing.sdc")), FileType::Constraints);
        assert_eq!(FileType::infer(Path::new("README")), FileType::Other);
    }

    #[test]
    fn test_resolve_source_missing() {
        let err = resolve_source("definitely/not/here.v").unwrap_err();
        match err {
            OpError::UploadSourceMissing(msg) => assert!(msg.contains("does not exist")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_resolve_source_directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_source(dir.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, OpError::UploadSourceMissing(_)));
    }

    #[test]
    fn test_resolve_source_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("alu.v");
        std::fs::write(&file, "module alu; endmodule\n").unwrap();
        let resolved = resolve_source(file.to_str().unwrap()).unwrap();
        assert!(resolved.is_absolute());
        assert_eq!(resolved, file);
    }
}
