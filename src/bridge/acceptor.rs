// src/bridge/acceptor.rs
//
// One-at-a-time connection acceptor. Same handshake as the gated readers:
// accept once, publish the outcome, park until released. The dispatcher
// only releases it after the previous session is gone, so the listener's
// backlog is the only place a second client ever waits.

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use super::types::{AcceptOutcome, AcceptorLink};

pub fn spawn_acceptor(listener: TcpListener) -> AcceptorLink {
    let (outcome_tx, outcome_rx) = mpsc::channel(1);
    let (release_tx, release_rx) = mpsc::channel(1);

    let task = tokio::spawn(run_acceptor(listener, outcome_tx, release_rx));

    AcceptorLink { outcome_rx, release_tx, task }
}

async fn run_acceptor(
    listener: TcpListener,
    outcome_tx: mpsc::Sender<AcceptOutcome>,
    mut release_rx: mpsc::Receiver<()>,
) {
    loop {
        let outcome = listener.accept().await;
        if outcome_tx.send(outcome).await.is_err() {
            return;
        }
        if release_rx.recv().await.is_none() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpStream;
    use tokio::time::timeout;

    const TICK: Duration = Duration::from_millis(150);

    #[tokio::test]
    async fn test_acceptor_publishes_one_connection_per_release() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut link = spawn_acceptor(listener);

        let _c1 = TcpStream::connect(addr).await.unwrap();
        let first = timeout(TICK, link.outcome_rx.recv()).await.unwrap().unwrap();
        assert!(first.is_ok());

        // Second client lands in the backlog; no outcome until released.
        let _c2 = TcpStream::connect(addr).await.unwrap();
        assert!(timeout(TICK, link.outcome_rx.recv()).await.is_err());

        link.release_tx.send(()).await.unwrap();
        let second = timeout(TICK, link.outcome_rx.recv()).await.unwrap().unwrap();
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_acceptor_ends_when_release_channel_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let link = spawn_acceptor(listener);

        let _c1 = TcpStream::connect(addr).await.unwrap();

        let AcceptorLink { mut outcome_rx, release_tx, task } = link;
        timeout(TICK, outcome_rx.recv()).await.unwrap().unwrap().unwrap();

        drop(release_tx);
        timeout(TICK, task).await.unwrap().unwrap();
    }
}
