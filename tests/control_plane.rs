//! Integration tests for rule administration over the control socket.

mod common;

use common::TestServer;
use fmac_proto::ControlReply;

#[tokio::test]
async fn data_prefix_rule() {
    let server = TestServer::spawn().await.expect("Failed to spawn daemon");
    let mut control = server.control().await.unwrap();

    control.ok("add /data 1000 1 open").await.unwrap();

    assert_eq!(control.ok("check /data/local/tmp 1000 open").await.unwrap(), ["deny"]);
    assert_eq!(control.ok("check /data/local/tmp 1001 open").await.unwrap(), ["allow"]);
    assert_eq!(control.ok("check /other 1000 open").await.unwrap(), ["allow"]);
    assert_eq!(
        control.ok("list").await.unwrap(),
        ["path=/data uid=1000 op=open deny=1"]
    );
}

#[tokio::test]
async fn malformed_commands_report_errors() {
    let server = TestServer::spawn().await.expect("Failed to spawn daemon");
    let mut control = server.control().await.unwrap();

    for line in ["bogus", "add /data 1000 7", "add relative 1 1", "check /x notauid open"] {
        assert!(
            matches!(control.command(line).await.unwrap(), ControlReply::Err(_)),
            "{line:?} was accepted"
        );
    }
    assert!(control.ok("list").await.unwrap().is_empty());

    // An over-long line is refused and ends the session.
    let long = format!("add /{} 1 1", "a".repeat(600));
    assert!(matches!(control.command(&long).await.unwrap(), ControlReply::Err(_)));
    let mut again = server.control().await.unwrap();
    assert!(again.ok("list").await.unwrap().is_empty());
}

#[tokio::test]
async fn disable_printk_and_log() {
    let server = TestServer::spawn().await.expect("Failed to spawn daemon");
    let mut control = server.control().await.unwrap();

    control.ok("add /system * 1 unlink").await.unwrap();
    control.ok("printk_on").await.unwrap();
    assert_eq!(control.ok("check /system/bin/sh 2000 unlink").await.unwrap(), ["deny"]);

    control.ok("disable").await.unwrap();
    assert_eq!(control.ok("check /system/bin/sh 2000 unlink").await.unwrap(), ["allow"]);
    control.ok("enable").await.unwrap();

    let log = control.ok("log").await.unwrap();
    assert_eq!(log.len(), 1);
    assert!(log[0].ends_with("denied unlink of /system/bin/sh for uid 2000"));
}

#[tokio::test]
async fn allowlist_administration() {
    let server = TestServer::spawn_with(
        r#"
[rules]
allowlist = [2000]
max_allowlist = 3
"#,
    )
    .await
    .expect("Failed to spawn daemon");
    let mut control = server.control().await.unwrap();

    assert_eq!(control.ok("uids").await.unwrap(), ["2000"]);
    assert_eq!(control.ok("allow 2000,x,3000,4000,5000").await.unwrap(), ["added 2"]);
    assert_eq!(control.ok("uids").await.unwrap(), ["2000,3000,4000"]);
}

#[tokio::test]
async fn default_deny_posture() {
    let server = TestServer::spawn_with(
        r#"
[rules]
default_deny = true
"#,
    )
    .await
    .expect("Failed to spawn daemon");
    let mut control = server.control().await.unwrap();

    assert_eq!(control.ok("check /anything 1 mkdir").await.unwrap(), ["deny"]);
    control.ok("add /tmp * 0").await.unwrap();
    assert_eq!(control.ok("check /tmp/x 1 mkdir").await.unwrap(), ["allow"]);
}
