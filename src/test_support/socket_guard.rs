//! Skips wiremock tests where localhost sockets cannot be bound.

use std::net::TcpListener;

use wiremock::MockServer;

/// Returns true if a localhost TCP socket can be bound.
#[must_use]
pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Starts a mock server, or returns `None` (after logging) when the sandbox
/// forbids binding sockets.
pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if !can_bind_localhost() {
        eprintln!("skipping: cannot bind localhost sockets in this environment");
        return None;
    }
    Some(MockServer::start().await)
}
