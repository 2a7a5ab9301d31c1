// One-shot embedded server shared by the integration tests.

use std::net::TcpStream;
use std::sync::{OnceLock, mpsc};
use std::time::Duration;

static BASE_URL: OnceLock<String> = OnceLock::new();

/// Boot the game server once for the whole test binary and return its base
/// URL. The server runs on its own OS thread with a dedicated runtime so it
/// outlives any single `#[tokio::test]`.
pub fn ensure_server() -> &'static str {
    BASE_URL.get_or_init(|| {
        let (addr_tx, addr_rx) = mpsc::channel();
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // An ephemeral port keeps parallel test binaries from
                // clashing with each other or local services.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind test listener");
                let addr = listener.local_addr().expect("listener addr");
                addr_tx.send(addr).expect("publish test addr");
                horde_server::run(listener).await.expect("server exited");
            });
        });

        let addr = addr_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("server thread never bound");
        wait_until_accepting(&addr.to_string());
        format!("http://{addr}")
    })
}

fn wait_until_accepting(addr: &str) {
    for _ in 0..100 {
        if TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("server at {addr} did not accept connections in time");
}
