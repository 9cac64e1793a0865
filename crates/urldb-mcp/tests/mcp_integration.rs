// ABOUTME: Integration tests driving the url-db MCP server through its dispatcher and transports
// ABOUTME: Covers handshake, catalog, end-to-end tool flows, HTTP/SSE routers, and the stream transport
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::io::{duplex, split, AsyncReadExt, AsyncWriteExt};
use tower::ServiceExt;
use urldb::{MemoryStore, ServerConfig};

use urldb_mcp::protocol::{
    JsonRpcRequest, JsonRpcResponse, INTERNAL_ERROR, INVALID_REQUEST, METHOD_NOT_FOUND,
};
use urldb_mcp::server::McpServer;
use urldb_mcp::transport::http::HttpTransport;
use urldb_mcp::transport::sse::SseTransport;
use urldb_mcp::transport::stdio::StdioTransport;
use urldb_mcp::transport::McpTransport;

fn server() -> Arc<McpServer> {
    Arc::new(
        McpServer::from_config(Arc::new(MemoryStore::new()), &ServerConfig::default())
            .expect("catalog"),
    )
}

async fn call_tool(server: &McpServer, id: i64, name: &str, arguments: Value) -> JsonRpcResponse {
    server
        .handle_request(JsonRpcRequest::new(
            Some(json!(id)),
            "tools/call",
            Some(json!({"name": name, "arguments": arguments})),
        ))
        .await
        .expect("response")
}

/// Call a tool that must succeed and return its structured content
async fn structured(server: &McpServer, name: &str, arguments: Value) -> Value {
    let response = call_tool(server, 1, name, arguments).await;
    assert!(response.error.is_none(), "{name} failed: {:?}", response.error);
    let result = response.result.expect("result");
    assert_eq!(result["isError"], false, "{name}: {result}");
    result["structuredContent"].clone()
}

/// Send a request and parse the response body as JSON
async fn send_and_parse(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("send request");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect")
        .to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn post_mcp(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("serialize")))
        .expect("build request")
}

// ============================================================================
// Dispatcher
// ============================================================================

#[tokio::test]
async fn initialized_notification_gets_no_response() {
    let request = JsonRpcRequest::new(None, "notifications/initialized", None);
    assert!(server().handle_request(request).await.is_none());
}

#[tokio::test]
async fn wrong_version_echoes_every_id_shape() {
    for id in [Some(json!("req-1")), Some(json!(42)), None] {
        let mut request = JsonRpcRequest::new(id.clone(), "initialize", None);
        request.jsonrpc = "1.0".to_owned();
        let response = server().handle_request(request).await.expect("response");
        assert_eq!(response.error_code(), Some(INVALID_REQUEST));
        assert_eq!(response.id, id);
    }
}

#[tokio::test]
async fn uncataloged_tool_is_method_not_found() {
    let response = call_tool(&server(), 3, "launch_rocket", json!({})).await;
    let error = response.error.expect("error");
    assert_eq!(error.code, METHOD_NOT_FOUND);
    assert!(error.message.contains("launch_rocket"));
}

#[tokio::test]
async fn every_listed_tool_is_dispatchable() {
    let server = server();
    let response = server
        .handle_request(JsonRpcRequest::new(Some(json!(1)), "tools/list", None))
        .await
        .expect("response");
    let tools = response.result.expect("result")["tools"].clone();
    let tools = tools.as_array().expect("array");
    assert_eq!(tools.len(), 31);

    for tool in tools {
        let name = tool["name"].as_str().expect("name");
        assert!(tool["inputSchema"]["type"] == "object", "{name}");
        let response = call_tool(&server, 2, name, json!({})).await;
        assert_ne!(
            response.error_code(),
            Some(METHOD_NOT_FOUND),
            "{name} is listed but not dispatchable"
        );
    }
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[tokio::test]
async fn created_domain_is_listed_normalized() {
    let server = server();
    let created = structured(
        &server,
        "create_domain",
        json!({"name": "Tech Articles", "description": "Reading list"}),
    )
    .await;
    assert_eq!(created["name"], "tech-articles");

    let listed = structured(&server, "list_domains", json!({})).await;
    let names: Vec<&str> = listed["items"]
        .as_array()
        .expect("items")
        .iter()
        .filter_map(|d| d["name"].as_str())
        .collect();
    assert!(names.contains(&"tech-articles"), "{names:?}");
}

#[tokio::test]
async fn zero_id_composite_key_fails_execution() {
    let server = server();
    structured(
        &server,
        "create_domain",
        json!({"name": "Tech Articles", "description": "Reading list"}),
    )
    .await;

    let response = call_tool(
        &server,
        5,
        "get_node",
        json!({"composite_id": "url-db:tech-articles:0"}),
    )
    .await;
    let error = response.error.expect("error");
    assert_eq!(error.code, INTERNAL_ERROR);
    assert_eq!(error.message, "Tool execution failed");
    let data = error.data.expect("data");
    assert!(
        data.as_str().is_some_and(|m| m.starts_with("invalid composite_id")),
        "{data}"
    );
}

#[tokio::test]
async fn node_lifecycle_with_attributes_and_dependencies() {
    let server = server();
    structured(
        &server,
        "create_domain",
        json!({"name": "docs", "description": "Documentation"}),
    )
    .await;

    let guide = structured(
        &server,
        "create_node",
        json!({"domain_name": "docs", "url": "https://example.com/guide", "title": "Guide"}),
    )
    .await;
    let guide_id = guide["composite_id"].as_str().expect("id").to_owned();
    let api = structured(
        &server,
        "create_node",
        json!({"domain_name": "docs", "url": "https://example.com/api"}),
    )
    .await;
    let api_id = api["composite_id"].as_str().expect("id").to_owned();

    structured(
        &server,
        "create_domain_attribute",
        json!({"domain_name": "docs", "name": "level", "type": "tag"}),
    )
    .await;
    structured(
        &server,
        "set_node_attributes",
        json!({"composite_id": guide_id, "attributes": [{"name": "level", "value": "beginner"}]}),
    )
    .await;

    let filtered = structured(
        &server,
        "filter_nodes_by_attributes",
        json!({"domain_name": "docs", "filters": [{"name": "level", "value": "begin", "operator": "starts_with"}]}),
    )
    .await;
    assert_eq!(filtered["total_count"], 1);
    assert_eq!(filtered["nodes"][0]["composite_id"], guide_id.as_str());

    structured(
        &server,
        "create_dependency",
        json!({
            "dependent_node_id": api_id,
            "dependency_node_id": guide_id,
            "dependency_type": "reference"
        }),
    )
    .await;
    let dependents = structured(
        &server,
        "list_node_dependents",
        json!({"composite_id": guide_id}),
    )
    .await;
    assert_eq!(
        dependents["dependents"][0]["dependent_composite_id"],
        api_id.as_str()
    );

    structured(&server, "delete_node", json!({"composite_id": guide_id})).await;
    let deps = structured(
        &server,
        "list_node_dependencies",
        json!({"composite_id": api_id}),
    )
    .await;
    assert_eq!(deps["dependencies"].as_array().map(Vec::len), Some(0));

    let gone = call_tool(&server, 9, "get_node", json!({"composite_id": guide_id})).await;
    assert_eq!(gone.error_code(), Some(INTERNAL_ERROR));
}

#[tokio::test]
async fn template_validation_failure_is_a_tool_result() {
    let response = call_tool(
        &server(),
        1,
        "validate_template",
        json!({"template_data": {"type": "layout"}}),
    )
    .await;
    assert!(response.error.is_none());
    let result = response.result.expect("result");
    assert_eq!(result["isError"], true);
    assert_eq!(result["structuredContent"]["valid"], false);
}

// ============================================================================
// HTTP and SSE transports
// ============================================================================

fn http_app() -> axum::Router {
    let mut transport = HttpTransport::new("127.0.0.1".to_owned(), 0);
    transport.set_request_handler(server());
    transport.router().expect("router")
}

#[tokio::test]
async fn http_initialize_round_trip() {
    let (status, json) = send_and_parse(
        http_app(),
        post_mcp(&json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"]["serverInfo"]["name"], "url-db-mcp-server");
    assert_eq!(json["result"]["protocolVersion"], "2025-06-18");
}

#[tokio::test]
async fn http_tool_call_and_health() {
    let (status, json) = send_and_parse(
        http_app(),
        post_mcp(&json!({
            "jsonrpc": "2.0",
            "id": "a",
            "method": "tools/call",
            "params": {"name": "get_server_info"}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], "a");
    assert_eq!(json["result"]["structuredContent"]["tool_name"], "url-db");

    let (status, json) = send_and_parse(
        http_app(),
        Request::builder()
            .uri("/health")
            .body(Body::empty())
            .expect("build request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["mode"], "http");
}

#[tokio::test]
async fn http_notification_is_no_content() {
    let (status, _) = send_and_parse(
        http_app(),
        post_mcp(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn sse_frames_the_response_as_one_event() {
    let mut transport = SseTransport::new("127.0.0.1".to_owned(), 0);
    transport.set_request_handler(server());
    let app = transport.router().expect("router");

    let response = app
        .oneshot(post_mcp(
            &json!({"jsonrpc": "2.0", "id": 7, "method": "ping"}),
        ))
        .await
        .expect("send request");
    assert_eq!(response.headers()["content-type"], "text/event-stream");

    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect")
        .to_bytes();
    let body = String::from_utf8(bytes.to_vec()).expect("utf8");
    assert_eq!(body, "data: {\"jsonrpc\":\"2.0\",\"id\":7,\"result\":{}}\n\n");
}

// ============================================================================
// Stream transport
// ============================================================================

async fn run_stdio(input: &[u8]) -> Vec<u8> {
    let (client, server_side) = duplex(1 << 20);
    let (server_read, server_write) = split(server_side);
    let mut transport = StdioTransport::with_io(Box::new(server_read), Box::new(server_write));
    transport.set_request_handler(server());

    let (mut client_read, mut client_write) = split(client);
    client_write.write_all(input).await.expect("write input");
    client_write.shutdown().await.expect("close input");

    transport.start().await.expect("clean exit");
    drop(transport);

    let mut output = Vec::new();
    client_read
        .read_to_end(&mut output)
        .await
        .expect("read output");
    output
}

#[tokio::test]
async fn stdio_notification_then_eof_writes_nothing() {
    let output = run_stdio(b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n").await;
    assert!(output.is_empty());
}

#[tokio::test]
async fn stdio_session_survives_garbage() {
    let input = concat!(
        "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{}}\n",
        "this is not json\n",
        "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}",
        "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/call\",",
        "\"params\":{\"name\":\"create_domain\",\"arguments\":{\"name\":\"News\",\"description\":\"Feeds\"}}}\n",
    );
    let output = run_stdio(input.as_bytes()).await;
    let lines: Vec<Value> = String::from_utf8(output)
        .expect("utf8")
        .lines()
        .map(|l| serde_json::from_str(l).expect("json line"))
        .collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["id"], 1);
    assert_eq!(lines[1]["error"]["code"], -32_700);
    assert_eq!(lines[2]["id"], 2);
    assert_eq!(lines[2]["result"]["structuredContent"]["name"], "news");
}
