//! Integration tests: a typed chat proxy over an in-memory chat server.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::json;

use hubproxy::Completion;
use hubproxy::EventHandler;
use hubproxy::Observable;
use hubproxy::Pending;
use hubproxy::ProxyBuilder;
use hubproxy::Subscription;
use hubproxy::Transport;
use hubproxy::TransportExt;
use hubproxy::hub_contract;
use hubproxy::mock_transport::MockTransport;
use hubproxy::transport;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[hub_contract(hub_name = "chat")]
pub trait IChatHub {
    #[method_name("Send")]
    fn send(&self, user: String, text: String) -> Completion;

    #[method_name("Kick")]
    fn kick(&self, user: String) -> Completion;

    #[method_name("GetHistory")]
    fn history(&self) -> Pending<Vec<String>>;

    #[method_name("ReceiveMessage")]
    fn on_message(&self, handler: impl Fn(String, String) + Send + Sync + 'static) -> Subscription;

    #[method_name("Typing")]
    fn typing(&self) -> Observable<bool>;
}

/// Chat server living inside the transport.
///
/// `Send` appends to the history and broadcasts `ReceiveMessage` followed by
/// `Typing(false)`. Every other method is a remote fault.
#[derive(Default)]
struct ChatServer {
    events: MockTransport,
    history: Mutex<Vec<String>>,
}

impl ChatServer {
    fn fault(method: &str) -> transport::Error {
        transport::Error::Remote {
            method: method.to_string(),
            message: "no such hub method".into(),
        }
    }

    fn start_typing(&self) {
        self.events.emit("Typing", vec![json!(true)]);
    }
}

#[async_trait::async_trait]
impl Transport for ChatServer {
    async fn call(&self, method: &str, args: Vec<Value>) -> transport::Result<()> {
        match (method, args.as_slice()) {
            ("Send", [user, text]) => {
                let line = format!("{}: {}", user.as_str().unwrap_or("?"), text.as_str().unwrap_or("?"));
                self.history.lock().unwrap().push(line);
                self.events.emit("ReceiveMessage", args.clone());
                self.events.emit("Typing", vec![json!(false)]);
                Ok(())
            }
            _ => Err(Self::fault(method)),
        }
    }

    async fn call_typed<R>(&self, method: &str, _args: Vec<Value>) -> transport::Result<R>
    where
        R: DeserializeOwned + Send + 'static,
    {
        match method {
            "GetHistory" => {
                let history = self.history.lock().unwrap().clone();
                Ok(serde_json::from_value(json!(history))?)
            }
            _ => Err(Self::fault(method)),
        }
    }

    fn subscribe(&self, event: &str, handler: EventHandler) -> Subscription {
        self.events.subscribe(event, handler)
    }
}

#[tokio::test]
async fn test_chat_round_trip() -> anyhow::Result<()> {
    init_tracing();
    let server = Arc::new(ChatServer::default());
    let chat: IChatHubProxy<ChatServer> = server.strong_typed()?;
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();

    let _sub = chat.on_message(move |user, text| sink.lock().unwrap().push(format!("{} said {}", user, text)));
    chat.send("ada".into(), "hello".into()).await?;
    chat.send("bob".into(), "hi ada".into()).await?;

    assert_eq!(chat.history().await?, vec!["ada: hello".to_string(), "bob: hi ada".to_string()]);
    assert_eq!(
        *received.lock().unwrap(),
        vec!["ada said hello".to_string(), "bob said hi ada".to_string()]
    );
    assert_eq!(chat.hub_table().hub_name(), "chat");
    Ok(())
}

#[tokio::test]
async fn test_remote_fault_is_returned_unchanged() -> anyhow::Result<()> {
    init_tracing();
    let server = Arc::new(ChatServer::default());
    let chat: IChatHubProxy<ChatServer> = server.strong_typed()?;

    let err = chat.kick("bob".into()).await.unwrap_err();

    assert_eq!(err, ChatServer::fault("Kick"));
    Ok(())
}

#[tokio::test]
async fn test_typing_stream_reaches_every_observer() -> anyhow::Result<()> {
    init_tracing();
    let server = Arc::new(ChatServer::default());
    let chat: IChatHubProxy<ChatServer> = server.strong_typed()?;

    let mut first = chat.typing().stream();
    let mut second = chat.typing().stream();

    server.start_typing();
    chat.send("ada".into(), "done".into()).await?;

    for stream in [&mut first, &mut second] {
        let a = tokio::time::timeout(Duration::from_secs(1), stream.next()).await?;
        let b = tokio::time::timeout(Duration::from_secs(1), stream.next()).await?;
        assert_eq!((a, b), (Some(true), Some(false)));
    }
    assert_eq!(server.events.subscriber_count("Typing"), 1);
    Ok(())
}

#[tokio::test]
async fn test_dropped_stream_detaches() -> anyhow::Result<()> {
    init_tracing();
    let server = Arc::new(ChatServer::default());
    let chat: IChatHubProxy<ChatServer> = server.strong_typed()?;

    let stream = chat.typing().stream();
    assert_eq!(chat.typing().observer_count(), 1);
    drop(stream);

    assert_eq!(chat.typing().observer_count(), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_share_one_proxy() -> anyhow::Result<()> {
    init_tracing();
    let server = Arc::new(ChatServer::default());
    let chat: Arc<IChatHubProxy<ChatServer>> = Arc::new(server.strong_typed()?);
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = delivered.clone();
    let _sub = chat.on_message(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let chat = chat.clone();
            tokio::spawn(async move { chat.send(format!("user{}", i), "ping".into()).await })
        })
        .collect();
    for task in tasks {
        task.await??;
    }

    assert_eq!(chat.history().await?.len(), 32);
    assert_eq!(delivered.load(Ordering::SeqCst), 32);
    Ok(())
}

#[tokio::test]
async fn test_builder_over_shared_transport() -> anyhow::Result<()> {
    init_tracing();
    let server = Arc::new(ChatServer::default());

    let first: IChatHubProxy<ChatServer> = ProxyBuilder::new(server.clone()).hub_name("lobby").build()?;
    let second = IChatHubProxy::new(server.clone())?;

    first.send("ada".into(), "one".into()).await?;
    second.send("bob".into(), "two".into()).await?;

    assert_eq!(first.hub_table().hub_name(), "lobby");
    assert_eq!(second.hub_table().hub_name(), "chat");
    assert_eq!(second.history().await?.len(), 2);
    assert_eq!(server.events.subscriber_count("Typing"), 2);
    Ok(())
}
