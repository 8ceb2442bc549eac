//! Ollama client tests against a local HTTP stub.

#![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]

use agentic_chat_runtime::*;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Captured request: (request line, JSON body).
type Captured = (String, Value);

/// Serve one canned response per accepted connection.
async fn spawn_stub(responses: Vec<(u16, String)>) -> (String, mpsc::UnboundedReceiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let _ = tx.send(request);

            let reason = if status == 200 { "OK" } else { "Error" };
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        }
    });

    (format!("http://{}", addr), rx)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Captured {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buffer).to_string();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let lower = line.to_ascii_lowercase();
                    lower
                        .strip_prefix("content-length:")
                        .and_then(|v| v.trim().parse::<usize>().ok())
                })
                .unwrap_or(0);
            if buffer.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    let text = String::from_utf8_lossy(&buffer).to_string();
    let request_line = text.lines().next().unwrap_or_default().to_string();
    let body = text
        .split_once("\r\n\r\n")
        .map(|(_, b)| b)
        .unwrap_or_default();
    let json = serde_json::from_str(body).unwrap_or(Value::Null);
    (request_line, json)
}

fn agent() -> AgentConfig {
    AgentConfig {
        name: "pdf-helper".to_string(),
        description: None,
        system_prompt: "You read documents.".to_string(),
        model: "llama3.2".to_string(),
        temperature: "0.4".to_string(),
        is_active: true,
    }
}

fn engine(base_url: &str) -> Engine {
    let factory = OllamaFactory::new(base_url, Duration::from_secs(5));
    Engine::new(Arc::new(ClientCache::new(Arc::new(factory))))
}

#[tokio::test]
async fn test_chat_round_trip() {
    let body = json!({
        "model": "llama3.2",
        "message": {"role": "assistant", "content": "The PDF has 3 pages."},
        "done": true
    })
    .to_string();
    let (base_url, mut requests) = spawn_stub(vec![(200, body)]).await;

    let output = engine(&base_url)
        .run(&agent(), &[], vec![Message::user("How many pages?")])
        .await
        .unwrap();
    assert_eq!(output.text(), "The PDF has 3 pages.");

    let (request_line, sent) = requests.recv().await.unwrap();
    assert!(request_line.starts_with("POST /api/chat"));
    assert_eq!(sent["model"], "llama3.2");
    assert_eq!(sent["stream"], false);
    let temperature = sent["options"]["temperature"].as_f64().unwrap();
    assert!((temperature - 0.4).abs() < 1e-6);
    assert_eq!(sent["messages"][0]["role"], "system");
    assert_eq!(sent["messages"][1], json!({"role": "user", "content": "How many pages?"}));
}

#[tokio::test]
async fn test_connection_refused_is_apology() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let output = engine(&format!("http://{}", addr))
        .run(&agent(), &[], vec![Message::user("Hi")])
        .await
        .unwrap();

    assert!(output.reply.is_failure());
    let text = output.text();
    assert!(text.starts_with("I apologize, but I encountered an error:"));
    assert!(text.contains("Network connection failed"));
}

#[tokio::test]
async fn test_unknown_model_status() {
    let (base_url, _requests) =
        spawn_stub(vec![(404, json!({"error": "model not found"}).to_string())]).await;

    let output = engine(&base_url)
        .run(&agent(), &[], vec![Message::user("Hi")])
        .await
        .unwrap();

    let text = output.text();
    assert!(text.contains("404"));
    assert!(text.contains("model not found"));
}

#[tokio::test]
async fn test_malformed_body() {
    let (base_url, _requests) = spawn_stub(vec![(200, "not json".to_string())]).await;

    let output = engine(&base_url)
        .run(&agent(), &[], vec![Message::user("Hi")])
        .await
        .unwrap();

    assert!(output.text().contains("Failed to parse response"));
}

#[tokio::test]
async fn test_list_models_strips_tags() {
    let body = json!({
        "models": [
            {"name": "llama3.2:latest"},
            {"name": "llama3.2:1b"},
            {"name": "mistral:7b"}
        ]
    })
    .to_string();
    let (base_url, mut requests) = spawn_stub(vec![(200, body)]).await;

    let factory = OllamaFactory::new(base_url, Duration::from_secs(5));
    let models = factory.list_models().await.unwrap();
    assert_eq!(models, vec!["llama3.2", "mistral"]);

    let (request_line, _) = requests.recv().await.unwrap();
    assert!(request_line.starts_with("GET /api/tags"));
}

#[tokio::test]
async fn test_list_models_server_error() {
    let (base_url, _requests) = spawn_stub(vec![(500, "{}".to_string())]).await;

    let factory = OllamaFactory::new(base_url, Duration::from_secs(5));
    match factory.list_models().await {
        Err(RuntimeError::LLMError(msg)) => assert!(msg.contains("Failed to list models")),
        other => panic!("Expected LLMError, got {:?}", other),
    }
}
