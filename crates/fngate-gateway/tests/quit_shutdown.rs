use fngate_gateway::resolver::StaticResolver;
use fngate_gateway::server::GatewayServer;
use fngate_kernel::GatewayConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[tokio::test]
async fn quit_request_stops_the_listener() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let server = GatewayServer::new(GatewayConfig::new(), Arc::new(StaticResolver::new()));
    let running = tokio::spawn(server.serve(listener));

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream
        .write_all(b"GET /__quit HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .expect("write request");
    let mut response = String::new();
    stream.read_to_string(&mut response).await.expect("read response");

    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.ends_with(r#"{"ok":true}"#), "{response}");

    let result = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("server stops after quit")
        .expect("server task");
    assert!(result.is_ok());
}

#[tokio::test]
async fn quit_handle_stops_the_listener() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");

    let server = GatewayServer::new(GatewayConfig::new(), Arc::new(StaticResolver::new()));
    let quit = server.quit_handle();
    let running = tokio::spawn(server.serve(listener));

    quit.notify_one();

    let result = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("server stops after quit")
        .expect("server task");
    assert!(result.is_ok());
}
