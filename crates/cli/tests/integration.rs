//! Probes against a live S3/OSS-compatible server
//!
//! Needs `RCPROBE_TEST_ENDPOINT`, `RCPROBE_TEST_ACCESS_KEY_ID`,
//! `RCPROBE_TEST_ACCESS_KEY_SECRET` and `RCPROBE_TEST_BUCKET`; tests are
//! skipped when any is unset.
//!
//! Run with: `cargo test --features integration`

#![cfg(feature = "integration")]

use std::process::Command;

use tempfile::TempDir;

struct Server {
    endpoint: String,
    access_key_id: String,
    access_key_secret: String,
    bucket: String,
}

fn server() -> Option<Server> {
    let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
    Some(Server {
        endpoint: var("RCPROBE_TEST_ENDPOINT")?,
        access_key_id: var("RCPROBE_TEST_ACCESS_KEY_ID")?,
        access_key_secret: var("RCPROBE_TEST_ACCESS_KEY_SECRET")?,
        bucket: var("RCPROBE_TEST_BUCKET")?,
    })
}

fn probe(server: &Server, dir: &TempDir, args: &[&str]) -> serde_json::Value {
    let output = Command::new(env!("CARGO_BIN_EXE_rcprobe"))
        .arg("probe")
        .args(args)
        .args([
            "-e",
            server.endpoint.as_str(),
            "-i",
            server.access_key_id.as_str(),
            "-k",
            server.access_key_secret.as_str(),
            "--json",
            "--output-dir",
            dir.path().to_str().unwrap(),
            "--config-file",
            dir.path().join("config.toml").to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute rcprobe");

    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("Output should be valid JSON")
}

fn setup() -> Option<(Server, TempDir)> {
    let server = server()?;
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("config.toml"), "[Credentials]\n").unwrap();
    Some((server, dir))
}

#[test]
fn test_normal_upload_then_download() {
    let Some((server, dir)) = setup() else {
        eprintln!("Skipping: integration server not configured");
        return;
    };

    let local = dir.path().join("payload.bin");
    let content: Vec<u8> = (0..64 * 1024u32).map(|i| (i % 256) as u8).collect();
    std::fs::write(&local, &content).unwrap();
    let remote = format!("oss://{}/rcprobe-it/payload.bin", server.bucket);

    let upload = probe(&server, &dir, &["--upload", local.to_str().unwrap(), remote.as_str()]);
    assert_eq!(upload["status"], "succeeded", "{upload}");
    assert_eq!(upload["bytes_transferred"], content.len() as u64);

    let dest = dir.path().join("downloaded.bin");
    let download = probe(&server, &dir, &["--download", remote.as_str(), dest.to_str().unwrap()]);
    assert_eq!(download["status"], "succeeded", "{download}");
    assert_eq!(std::fs::read(&dest).unwrap(), content);
}

#[test]
fn test_multipart_upload() {
    let Some((server, dir)) = setup() else {
        eprintln!("Skipping: integration server not configured");
        return;
    };

    let local = dir.path().join("big.bin");
    std::fs::write(&local, vec![42u8; 6 * 1024 * 1024]).unwrap();
    let remote = format!("oss://{}/rcprobe-it/big.bin", server.bucket);

    let upload = probe(
        &server,
        &dir,
        &[
            "--upload",
            "--upmode",
            "multipart",
            "--part-size",
            "1048576",
            local.to_str().unwrap(),
            remote.as_str(),
        ],
    );
    assert_eq!(upload["status"], "succeeded", "{upload}");
    assert_eq!(upload["strategy"], "multipart");
    assert_eq!(upload["bytes_transferred"], 6 * 1024 * 1024);
}

#[test]
fn test_seeded_download() {
    let Some((server, dir)) = setup() else {
        eprintln!("Skipping: integration server not configured");
        return;
    };

    let download = probe(&server, &dir, &["--download", "--bucket", server.bucket.as_str()]);
    assert_eq!(download["status"], "succeeded", "{download}");
    assert_eq!(download["attempts"], 1);
}
