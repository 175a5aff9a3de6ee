//! 行分隔 JSON 的 stdio 传输
//!
//! 每行一个请求：
//! - `{"method":"call","id":..,"operation":..,"arguments":{..}}` → `{"id":..,"content":..,"isError":..}`
//! - `{"method":"list","id":..}` → `{"id":..,"tools":[..]}`
//!
//! 未知操作、未知 method、无法解析的行走协议错误通道 `{"id":..,"error":{"code":..,"message":..}}`。

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::core::DispatchError;
use crate::tools::ToolExecutor;

pub const PARSE_ERROR: i64 = -32700;
pub const METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    operation: Option<String>,
    #[serde(default)]
    arguments: Value,
}

fn protocol_error(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({
        "id": id,
        "error": { "code": code, "message": message.into() },
    })
}

/// 处理一行请求；空行返回 None
pub async fn handle_line(executor: &ToolExecutor, line: &str) -> Option<Value> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let request: Request = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => return Some(protocol_error(Value::Null, PARSE_ERROR, format!("Parse error: {}", e))),
    };

    let reply = match request.method.as_str() {
        "list" => json!({
            "id": request.id,
            "tools": executor.descriptors(),
        }),
        "call" => {
            let Some(operation) = request.operation else {
                return Some(protocol_error(request.id, METHOD_NOT_FOUND, "Missing operation"));
            };
            match executor.invoke(&operation, request.arguments).await {
                Ok(result) => {
                    let reply = result.into_transport();
                    json!({
                        "id": request.id,
                        "content": reply.content,
                        "isError": reply.is_error,
                    })
                }
                Err(e @ DispatchError::UnknownOperation(_)) => {
                    protocol_error(request.id, METHOD_NOT_FOUND, e.to_string())
                }
            }
        }
        other => protocol_error(request.id, METHOD_NOT_FOUND, format!("Unknown method: {}", other)),
    };
    Some(reply)
}

/// 逐行读取请求并顺序应答，直到输入结束或收到取消
pub async fn serve<R, W>(
    executor: &ToolExecutor,
    reader: R,
    mut writer: W,
    token: CancellationToken,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    loop {
        let line = tokio::select! {
            _ = token.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            tracing::info!("stdin closed");
            break;
        };
        if let Some(reply) = handle_line(executor, &line).await {
            writer.write_all(reply.to_string().as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OpError;
    use crate::tools::{FnTool, ToolRegistry};
    use schemars::JsonSchema;

    #[derive(Deserialize, JsonSchema)]
    struct EchoArgs {
        text: String,
    }

    fn executor() -> ToolExecutor {
        let mut registry = ToolRegistry::new();
        registry.register(FnTool::new("echo", "Echo text", |args: EchoArgs| async move {
            if args.text == "fail" {
                return Err(OpError::Driver("boom".to_string()));
            }
            Ok::<Value, OpError>(json!({ "text": args.text }))
        }));
        ToolExecutor::new(registry)
    }

    #[tokio::test]
    async fn test_call_success_and_failure() {
        let exec = executor();
        let ok = handle_line(&exec, r#"{"method":"call","id":1,"operation":"echo","arguments":{"text":"hi"}}"#)
            .await
            .unwrap();
        assert_eq!(ok["id"], 1);
        assert_eq!(ok["isError"], false);
        assert!(ok["content"].as_str().unwrap().contains("hi"));

        let failed = handle_line(&exec, r#"{"method":"call","id":2,"operation":"echo","arguments":{"text":"fail"}}"#)
            .await
            .unwrap();
        assert_eq!(failed["isError"], true);
        assert!(failed["content"].as_str().unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_unknown_operation_uses_protocol_channel() {
        let exec = executor();
        let reply = handle_line(&exec, r#"{"method":"call","id":"a","operation":"nope"}"#)
            .await
            .unwrap();
        assert_eq!(reply["id"], "a");
        assert_eq!(reply["error"]["code"], METHOD_NOT_FOUND);
        assert!(reply.get("isError").is_none());
    }

    #[tokio::test]
    async fn test_parse_error_and_blank_lines() {
        let exec = executor();
        assert!(handle_line(&exec, "   ").await.is_none());
        let reply = handle_line(&exec, "{not json").await.unwrap();
        assert_eq!(reply["error"]["code"], PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_serve_until_eof() {
        let exec = executor();
        let input = concat!(
            r#"{"method":"list","id":1}"#,
            "\n\n",
            r#"{"method":"call","id":2,"operation":"echo","arguments":{"text":"x"}}"#,
            "\n"
        );
        let mut out = Vec::new();
        serve(&exec, input.as_bytes(), &mut out, CancellationToken::new())
            .await
            .unwrap();
        let replies: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["tools"][0]["name"], "echo");
        assert_eq!(replies[1]["isError"], false);
    }
}
