//! Integration tests for the admission path over the trigger socket.

mod common;

use common::TestServer;
use fmac_proto::{ControlReply, TriggerReply};

#[tokio::test]
async fn signed_challenge_is_admitted_once() {
    let server = TestServer::spawn().await.expect("Failed to spawn daemon");
    let mut trigger = server.trigger().await.expect("Failed to connect");

    let signature = server.signed_current().await.unwrap();

    let reply = trigger.submit(&signature).await.unwrap();
    let TriggerReply::Granted(grant) = reply else {
        panic!("expected a capability grant, got {reply:?}");
    };
    assert_eq!(grant.handle, 3);
    assert_eq!(grant.protocol_version, 1);

    // Same signature, same window: replay.
    assert_eq!(trigger.submit(&signature).await.unwrap(), TriggerReply::Rejected);

    // Garbage is rejected without closing the connection.
    assert_eq!(trigger.submit(&[0u8; 70]).await.unwrap(), TriggerReply::Rejected);
    assert_eq!(trigger.submit(b"short").await.unwrap(), TriggerReply::Rejected);
}

#[tokio::test]
async fn rejection_reasons_only_reach_the_log() {
    let server = TestServer::spawn().await.expect("Failed to spawn daemon");
    let mut trigger = server.trigger().await.unwrap();
    let mut control = server.control().await.unwrap();

    assert_eq!(trigger.submit(&[0x30; 72]).await.unwrap(), TriggerReply::Rejected);

    let log = control.ok("log").await.unwrap();
    assert!(
        log.iter().any(|l| l.contains("signature does not verify")),
        "log: {log:?}"
    );
}

#[tokio::test]
async fn escalated_record_is_visible_while_connected() {
    let server = TestServer::spawn().await.expect("Failed to spawn daemon");
    let mut trigger = server.trigger().await.unwrap();
    let mut control = server.control().await.unwrap();
    let pid = std::process::id();

    let signature = server.signed_current().await.unwrap();
    assert!(matches!(
        trigger.submit(&signature).await.unwrap(),
        TriggerReply::Granted(_)
    ));

    let creds = control.ok(&format!("creds {pid}")).await.unwrap();
    assert_eq!(creds[0], "uid=0/0/0/0");

    drop(trigger);
    // The record is released with the connection.
    for _ in 0..20 {
        if matches!(
            control.command(&format!("creds {pid}")).await.unwrap(),
            ControlReply::Err(_)
        ) {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    panic!("privilege record outlived the trigger connection");
}

#[tokio::test]
async fn allowlist_excludes_other_uids() {
    let server = TestServer::spawn().await.expect("Failed to spawn daemon");
    let mut trigger = server.trigger().await.unwrap();
    let mut control = server.control().await.unwrap();

    // No real process runs as this uid.
    control.ok("allow 4294967294").await.unwrap();

    let signature = server.signed_current().await.unwrap();
    assert_eq!(trigger.submit(&signature).await.unwrap(), TriggerReply::Rejected);

    let log = control.ok("log").await.unwrap();
    assert!(log.iter().any(|l| l.contains("not on the allowlist")));
}

#[tokio::test]
async fn oversized_frame_closes_connection() {
    let server = TestServer::spawn().await.expect("Failed to spawn daemon");
    let mut trigger = server.trigger().await.unwrap();

    trigger.send_raw(&[0x02, 0x01]).await.unwrap();
    assert!(trigger.is_closed().await);

    // The daemon keeps serving new connections.
    let mut again = server.trigger().await.unwrap();
    assert_eq!(again.submit(&[1u8; 64]).await.unwrap(), TriggerReply::Rejected);
}
