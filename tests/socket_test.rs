use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};

use gollama_chat::service::chat_service::ChatService;
use gollama_chat::socket::SocketConnectionManager;
use gollama_chat::{
    ConversationState, ConversationStreamReducer, FrameSink, Message as ChatMessage,
};

const GREETING: &str = "Hey! How can I assist you today?";

/// What the test server saw from the client.
#[derive(Debug, PartialEq)]
enum ServerEvent {
    Request(Value),
    Closed,
}

type Recorder = mpsc::UnboundedSender<ServerEvent>;

/// Scripted chat server: greets on connect, then answers every request with
/// one processing frame and one final frame. A few magic messages change the
/// script.
async fn spawn_server() -> (String, mpsc::UnboundedReceiver<ServerEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new().route("/ws", get(ws_handler)).with_state(tx);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    (format!("ws://{addr}/ws"), rx)
}

async fn ws_handler(ws: WebSocketUpgrade, State(recorder): State<Recorder>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, recorder))
}

async fn handle_socket(mut socket: WebSocket, recorder: Recorder) {
    send_json(&mut socket, json!({ "content": "", "response": GREETING })).await;

    while let Some(Ok(msg)) = socket.recv().await {
        let text = match msg {
            Message::Text(t) => t.to_string(),
            Message::Close(_) => {
                let _ = recorder.send(ServerEvent::Closed);
                break;
            }
            _ => continue,
        };
        let request: Value = serde_json::from_str(&text).expect("client sends JSON");
        let _ = recorder.send(ServerEvent::Request(request.clone()));

        let content = request["content"].as_str().unwrap_or_default().to_string();
        let session_id = match request["session_id"].as_str() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => "abc".to_string(),
        };

        match content.as_str() {
            "close" => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
            "garbage" => {
                let _ = socket.send(Message::Text("not json".into())).await;
            }
            _ => {}
        }

        send_json(
            &mut socket,
            json!({
                "content": "",
                "response": "Working on it",
                "session_id": session_id,
                "is_processing": true,
            }),
        )
        .await;
        send_json(
            &mut socket,
            json!({
                "content": "",
                "response": format!("echo: {content}"),
                "session_id": session_id,
            }),
        )
        .await;
    }
}

async fn send_json(socket: &mut WebSocket, value: Value) {
    let _ = socket.send(Message::Text(value.to_string().into())).await;
}

async fn next_frame(conn: &mut SocketConnectionManager) -> String {
    timeout(Duration::from_secs(2), conn.next_frame())
        .await
        .expect("frame receive timed out")
        .expect("connection closed unexpectedly")
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> ServerEvent {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("server event timed out")
        .expect("recorder closed unexpectedly")
}

async fn next_request(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Value {
    match next_event(rx).await {
        ServerEvent::Request(request) => request,
        other => panic!("expected a request, got {other:?}"),
    }
}

fn reply(text: &str, session_id: &str) -> ChatMessage {
    ChatMessage {
        response: Some(text.into()),
        session_id: Some(session_id.into()),
        ..ChatMessage::default()
    }
}

#[tokio::test]
async fn streamed_turn_over_live_socket() {
    let (url, mut requests) = spawn_server().await;
    let mut conn = SocketConnectionManager::connect(&url).await.expect("connect");
    assert!(conn.is_ready());
    assert_eq!(conn.url(), url);

    let mut reducer = ConversationStreamReducer::new();
    let greeting = next_frame(&mut conn).await;
    reducer.receive_frame(&greeting).expect("greeting parses");
    assert_eq!(reducer.messages().len(), 1);
    assert!(reducer.state().session_id().is_none());

    assert!(reducer.submit_user_message("hello", &conn));
    assert_eq!(
        next_request(&mut requests).await,
        json!({ "content": "hello", "session_id": "" })
    );

    let processing = next_frame(&mut conn).await;
    reducer.receive_frame(&processing).expect("processing frame parses");
    assert_eq!(reducer.messages().len(), 3);
    assert!(reducer.messages()[2].is_processing);
    assert_eq!(reducer.messages()[2].response.as_deref(), Some("Working on it"));

    let done = next_frame(&mut conn).await;
    reducer.receive_frame(&done).expect("final frame parses");
    assert_eq!(
        reducer.messages()[1..],
        [ChatMessage::user("hello"), reply("echo: hello", "abc")]
    );
    assert_eq!(reducer.state().session_id(), Some("abc"));

    assert!(reducer.submit_user_message("again", &conn));
    assert_eq!(
        next_request(&mut requests).await,
        json!({ "content": "again", "session_id": "abc" })
    );

    conn.close().await;
    assert_eq!(next_event(&mut requests).await, ServerEvent::Closed);
}

#[tokio::test]
async fn dropping_connection_closes_socket() {
    let (url, mut events) = spawn_server().await;
    let mut conn = SocketConnectionManager::connect(&url).await.expect("connect");
    next_frame(&mut conn).await;

    drop(conn);
    assert_eq!(next_event(&mut events).await, ServerEvent::Closed);
}

#[tokio::test]
async fn run_loop_finishes_pending_turn_after_input_ends() {
    let (url, _requests) = spawn_server().await;
    let mut conn = SocketConnectionManager::connect(&url).await.expect("connect");
    next_frame(&mut conn).await;

    let (input_tx, input_rx) = mpsc::channel(4);
    input_tx.send("hello".to_string()).await.expect("queue input");
    drop(input_tx);

    let mut snapshots: Vec<ConversationState> = Vec::new();
    let state = timeout(
        Duration::from_secs(5),
        ChatService::new(conn).run(input_rx, |state| snapshots.push(state.clone())),
    )
    .await
    .expect("run loop timed out");

    assert_eq!(state.messages(), [ChatMessage::user("hello"), reply("echo: hello", "abc")]);
    assert!(!state.is_awaiting_reply());
    assert!(snapshots.iter().any(|s| {
        s.messages()
            .iter()
            .any(|m| m.is_processing && m.response.as_deref() == Some("Working on it"))
    }));
    assert!(
        snapshots
            .iter()
            .all(|s| s.messages().iter().filter(|m| m.is_processing).count() <= 1)
    );
}

#[tokio::test]
async fn malformed_frame_does_not_disturb_turn() {
    let (url, _requests) = spawn_server().await;
    let mut conn = SocketConnectionManager::connect(&url).await.expect("connect");
    next_frame(&mut conn).await;

    let mut reducer = ConversationStreamReducer::new();
    assert!(reducer.submit_user_message("garbage", &conn));
    let before = reducer.state().clone();

    let bad = next_frame(&mut conn).await;
    assert!(reducer.receive_frame(&bad).is_err());
    assert_eq!(reducer.state(), &before);

    for _ in 0..2 {
        let frame = next_frame(&mut conn).await;
        reducer.receive_frame(&frame).expect("frame parses");
    }
    assert_eq!(reducer.messages(), [ChatMessage::user("garbage"), reply("echo: garbage", "abc")]);
}

#[tokio::test]
async fn sends_are_rejected_after_server_closes() {
    let (url, _requests) = spawn_server().await;
    let mut conn = SocketConnectionManager::connect(&url).await.expect("connect");
    next_frame(&mut conn).await;
    let mut connectivity = conn.connectivity();

    let mut reducer = ConversationStreamReducer::new();
    assert!(reducer.submit_user_message("close", &conn));

    let end = timeout(Duration::from_secs(2), conn.next_frame())
        .await
        .expect("close timed out");
    assert!(end.is_none());
    timeout(Duration::from_secs(2), connectivity.wait_for(|ready| !*ready))
        .await
        .expect("connectivity timed out")
        .expect("connectivity channel open");

    assert!(!conn.is_ready());
    assert!(!FrameSink::is_ready(&conn.sender()));
    assert!(conn.sender().send("late").is_err());

    let before = reducer.state().clone();
    assert!(!reducer.submit_user_message("anyone there?", &conn));
    assert_eq!(reducer.state(), &before);
    // The unfinished turn keeps its placeholder.
    assert!(reducer.state().is_awaiting_reply());
}

#[tokio::test]
async fn connect_failure_is_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("address");
    drop(listener);

    let err = SocketConnectionManager::connect(&format!("ws://{addr}/ws"))
        .await
        .err()
        .expect("connect should fail");
    assert!(err.is_connection());
}
