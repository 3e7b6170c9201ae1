//! Test daemon management.
//!
//! Spawns fmacd with a generated key pair and a temporary configuration.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use fmac_proto::TotpGenerator;
use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, KeyPair};
use std::path::PathBuf;
use std::process::{Child, Command};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tempfile::TempDir;
use tokio::time::sleep;

use super::client::{ControlClient, TriggerClient};

/// A running fmacd instance.
pub struct TestServer {
    child: Child,
    dir: TempDir,
    signer: EcdsaKeyPair,
    totp: TotpGenerator,
    rng: SystemRandom,
}

impl TestServer {
    /// Spawn with the default test configuration.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with("").await
    }

    /// Spawn with extra TOML appended to the generated configuration.
    pub async fn spawn_with(extra: &str) -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let rng = SystemRandom::new();

        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng)
            .map_err(|_| anyhow::anyhow!("key generation failed"))?;
        let signer =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng)
                .map_err(|e| anyhow::anyhow!("bad generated key: {e}"))?;

        let mut secret = [0u8; 20];
        rng.fill(&mut secret)
            .map_err(|_| anyhow::anyhow!("rng failed"))?;

        let config_path = dir.path().join("fmacd.toml");
        let config_content = format!(
            r#"
[server]
name = "fmacd-test"
metrics_port = 0

[listen]
trigger_socket = "{trigger}"
control_socket = "{control}"

[admission]
totp_secret = "{secret}"
public_key = "{public_key}"
scheme = "ecdsa-p256-sha256"
attempts_per_minute = 1000

[diagnostics]
log_capacity = 16384
{extra}
"#,
            trigger = dir.path().join("trigger.sock").display(),
            control = dir.path().join("control.sock").display(),
            secret = fmac_proto::base32::encode(&secret),
            public_key = BASE64.encode(signer.public_key().as_ref()),
        );
        std::fs::write(&config_path, config_content)?;

        let child = Command::new(env!("CARGO_BIN_EXE_fmacd"))
            .arg(&config_path)
            .spawn()?;

        let server = Self {
            child,
            dir,
            signer,
            totp: TotpGenerator::new(&secret),
            rng,
        };
        server.wait_until_ready().await?;
        Ok(server)
    }

    /// Wait until both sockets accept connections.
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..50 {
            if tokio::net::UnixStream::connect(self.control_path()).await.is_ok()
                && tokio::net::UnixStream::connect(self.trigger_path()).await.is_ok()
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("Daemon failed to start within 5 seconds")
    }

    pub fn trigger_path(&self) -> PathBuf {
        self.dir.path().join("trigger.sock")
    }

    pub fn control_path(&self) -> PathBuf {
        self.dir.path().join("control.sock")
    }

    pub async fn trigger(&self) -> anyhow::Result<TriggerClient> {
        TriggerClient::connect(&self.trigger_path()).await
    }

    pub async fn control(&self) -> anyhow::Result<ControlClient> {
        ControlClient::connect(&self.control_path()).await
    }

    /// Sign the code of the current TOTP step.
    ///
    /// Near the end of a step this waits until the daemon's cached code
    /// (5 s window) can no longer belong to the previous step.
    pub async fn signed_current(&self) -> anyhow::Result<Vec<u8>> {
        let secs = unix_now();
        if secs % 30 >= 24 {
            sleep(Duration::from_secs(36 - secs % 30)).await;
        }
        let code = self.totp.generate(unix_now());
        let signature = self
            .signer
            .sign(&self.rng, fmac_proto::totp::challenge_message(code).as_bytes())
            .map_err(|_| anyhow::anyhow!("signing failed"))?;
        Ok(signature.as_ref().to_vec())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
