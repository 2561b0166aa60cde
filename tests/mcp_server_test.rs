use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::io::AsyncReadExt;
use voice_tts::mcp::server::MAX_MESSAGE_BYTES;
use voice_tts::mcp::McpServer;

mod common;
use common::mock_tts::MockLoader;
use common::Harness;

/// Feed `lines` to an in-process server and collect responses keyed by id.
async fn exchange(h: &Harness, lines: &[String]) -> (Vec<Value>, HashMap<String, Value>) {
    let mut input = lines.join("\n");
    input.push('\n');
    exchange_bytes(h, input.as_bytes()).await
}

/// Same as [`exchange`], for input that is not necessarily text.
async fn exchange_bytes(h: &Harness, input: &[u8]) -> (Vec<Value>, HashMap<String, Value>) {
    let (server_out, mut client_in) = tokio::io::duplex(1 << 20);
    McpServer::new(h.tools.clone())
        .serve(input, server_out)
        .await
        .expect("server runs to EOF");

    let mut raw = String::new();
    client_in.read_to_string(&mut raw).await.unwrap();

    let responses: Vec<Value> = raw
        .lines()
        .map(|l| serde_json::from_str(l).expect("response is JSON"))
        .collect();
    let by_id = responses
        .iter()
        .map(|r| (r["id"].to_string(), r.clone()))
        .collect();
    (responses, by_id)
}

fn call(id: u64, name: &str, arguments: Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
    .to_string()
}

#[tokio::test]
async fn test_handshake_and_tool_listing() {
    let h = Harness::new();
    let lines = vec![
        json!({"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26","capabilities":{},"clientInfo":{"name":"test","version":"0"}}}).to_string(),
        json!({"jsonrpc":"2.0","method":"notifications/initialized"}).to_string(),
        json!({"jsonrpc":"2.0","id":2,"method":"tools/list"}).to_string(),
        json!({"jsonrpc":"2.0","id":3,"method":"ping"}).to_string(),
    ];
    let (responses, by_id) = exchange(&h, &lines).await;

    // The notification gets no reply
    assert_eq!(responses.len(), 3);

    let init = &by_id["1"]["result"];
    assert_eq!(init["protocolVersion"], "2025-03-26");
    assert_eq!(init["serverInfo"]["name"], "voice-tts");
    assert!(init["capabilities"]["tools"].is_object());

    let tools = by_id["2"]["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["speak", "list_voices", "set_default_voice"]);
    assert_eq!(tools[0]["inputSchema"]["properties"]["speed"]["default"], 1.0);

    assert_eq!(by_id["3"]["result"], json!({}));
}

#[tokio::test]
async fn test_tool_calls_return_text_content() {
    let h = Harness::new();
    let lines = vec![
        call(1, "list_voices", json!({"language": "b"})),
        call(2, "set_default_voice", json!({"voice": "nobody"})),
    ];
    let (_, by_id) = exchange(&h, &lines).await;

    let list = &by_id["1"]["result"];
    assert_eq!(list["isError"], false);
    let text = list["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("bm_george: British Male - George"));
    assert!(!text.contains("af_heart"));

    // Validation problems are answers, not failures
    let rejected = &by_id["2"]["result"];
    assert_eq!(rejected["isError"], false);
    assert!(rejected["content"][0]["text"]
        .as_str()
        .unwrap()
        .starts_with("Unknown voice 'nobody'"));
}

#[tokio::test]
async fn test_speak_through_server() {
    let h = Harness::new();
    let lines = vec![call(7, "speak", json!({"text": "Hello there", "voice": ""}))];
    let (_, by_id) = exchange(&h, &lines).await;

    assert_eq!(
        by_id["7"]["result"]["content"][0]["text"],
        "Spoke aloud (af_heart): Hello there"
    );
    assert_eq!(h.sink.play_count(), 1);
}

#[tokio::test]
async fn test_engine_failure_is_tool_error() {
    let h = Harness::with_loader(MockLoader::failing());
    let lines = vec![call(1, "speak", json!({"text": "Hello"}))];
    let (_, by_id) = exchange(&h, &lines).await;

    let result = &by_id["1"]["result"];
    assert_eq!(result["isError"], true);
    assert!(result["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("Mock engine failure"));
}

#[tokio::test]
async fn test_protocol_errors() {
    let h = Harness::new();
    let lines = vec![
        "{ this is not json".to_string(),
        json!({"jsonrpc":"2.0","id":1,"method":"resources/list"}).to_string(),
        call(2, "shout", json!({})),
        call(3, "speak", json!({"speed": 1.0})),
        json!({"jsonrpc":"2.0","id":4,"method":"tools/call"}).to_string(),
    ];
    let (responses, by_id) = exchange(&h, &lines).await;
    assert_eq!(responses.len(), 5);

    assert_eq!(by_id["null"]["error"]["code"], -32700);
    assert_eq!(by_id["1"]["error"]["code"], -32601);
    assert_eq!(by_id["2"]["error"]["code"], -32602);
    assert_eq!(by_id["3"]["error"]["code"], -32602);
    assert_eq!(by_id["4"]["error"]["code"], -32602);
}

#[tokio::test]
async fn test_invalid_utf8_does_not_stop_server() {
    let h = Harness::new();
    let mut input = b"\xff\xfe garbage\n".to_vec();
    input.extend_from_slice(json!({"jsonrpc":"2.0","id":9,"method":"ping"}).to_string().as_bytes());
    input.push(b'\n');

    let (responses, by_id) = exchange_bytes(&h, &input).await;
    assert_eq!(responses.len(), 2);
    assert_eq!(by_id["null"]["error"]["code"], -32700);
    assert_eq!(by_id["9"]["result"], json!({}));
}

#[tokio::test]
async fn test_oversized_message_rejected_then_served() {
    let h = Harness::new();
    let mut input = vec![b'{'; MAX_MESSAGE_BYTES + 100];
    input.push(b'\n');
    input.extend_from_slice(json!({"jsonrpc":"2.0","id":3,"method":"ping"}).to_string().as_bytes());
    input.push(b'\n');

    let (responses, by_id) = exchange_bytes(&h, &input).await;
    assert_eq!(responses.len(), 2);
    assert_eq!(by_id["null"]["error"]["code"], -32600);
    assert_eq!(by_id["3"]["result"], json!({}));
}

#[tokio::test]
async fn test_null_id_request_is_answered() {
    let h = Harness::new();
    let lines = vec![
        json!({"jsonrpc":"2.0","id":null,"method":"ping"}).to_string(),
        json!({"jsonrpc":"2.0","method":"notifications/initialized"}).to_string(),
    ];
    let (responses, _) = exchange(&h, &lines).await;

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["id"], Value::Null);
    assert_eq!(responses[0]["result"], json!({}));
}

#[tokio::test]
async fn test_unknown_protocol_version_gets_server_default() {
    let h = Harness::new();
    let lines = vec![
        json!({"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"1999-01-01"}}).to_string(),
        json!({"jsonrpc":"2.0","id":2,"method":"initialize","params":{}}).to_string(),
    ];
    let (_, by_id) = exchange(&h, &lines).await;

    assert_eq!(by_id["1"]["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(by_id["2"]["result"]["protocolVersion"], "2024-11-05");
}
