//! End-to-end tests of the `ftpscm` binary.
//!
//! Commands that talk to a server run against the scripted FTP server from
//! `remote::testutils`; the binary itself is driven on a blocking thread so that the
//! server keeps serving while we wait for the process.

use assert_cmd::Command;
use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;
use remote::testutils::MockFtpServer;

fn ftpscm() -> Command {
    Command::cargo_bin("ftpscm").unwrap()
}

async fn run(args: Vec<String>) -> std::process::Output {
    tokio::task::spawn_blocking(move || ftpscm().args(&args).output().unwrap())
        .await
        .unwrap()
}

fn write_registry(path: &std::path::Path, server: &MockFtpServer, credentials_id: &str) {
    let registry = serde_json::json!({
        "servers": [
            { "name": "release", "host": server.host(), "port": server.port(), "credentialsId": credentials_id }
        ]
    });
    std::fs::write(path, registry.to_string()).unwrap();
}

fn write_credentials(path: &std::path::Path) {
    let credentials = serde_json::json!({
        "credentials": [
            { "id": "release-ftp", "username": "bob", "password": "s3cret" }
        ]
    });
    std::fs::write(path, credentials.to_string()).unwrap();
}

fn path_arg(path: &std::path::Path) -> String {
    path.to_string_lossy().into_owned()
}

#[test]
fn test_help_runs() {
    ftpscm().arg("--help").assert().success();
    ftpscm().args(["checkout", "--help"]).assert().success();
    ftpscm().args(["servers", "add", "--help"]).assert().success();
}

#[test]
fn test_version_runs() {
    ftpscm().arg("--version").assert().success();
}

#[test]
fn test_checkout_requires_arguments() {
    ftpscm()
        .args(["checkout", "--server", "release"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--remote-path"));
}

#[test]
fn test_timeouts_accept_human_readable_durations() {
    ftpscm()
        .args(["--connect-timeout", "500ms", "--transfer-timeout", "2h", "--help"])
        .assert()
        .success();
    ftpscm()
        .args(["--connect-timeout", "soon", "servers", "list"])
        .assert()
        .failure();
}

#[test]
fn test_servers_add_and_list() {
    let tmp = tempfile::tempdir().unwrap();
    let registry = path_arg(&tmp.path().join("servers.json"));
    ftpscm()
        .args(["--registry", &registry, "servers", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no servers registered"));
    ftpscm()
        .args([
            "--registry",
            &registry,
            "servers",
            "add",
            "--name",
            "release",
            "--host",
            "10.0.0.5",
            "--port",
            "21",
        ])
        .assert()
        .success();
    ftpscm()
        .args([
            "servers",
            "add",
            "--name",
            "mirror",
            "--host",
            "10.0.0.6",
            "--port",
            "2121",
            "--registry",
            &registry,
        ])
        .assert()
        .success();
    ftpscm()
        .args(["--registry", &registry, "servers", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "release 10.0.0.5:21\nmirror 10.0.0.6:2121",
        ));
}

#[test]
fn test_servers_add_rejects_invalid_input() {
    let tmp = tempfile::tempdir().unwrap();
    let registry = path_arg(&tmp.path().join("servers.json"));
    let add = |host: &str, port: &str, credentials_id: &str| {
        ftpscm()
            .args([
                "--registry",
                &registry,
                "servers",
                "add",
                "--name",
                "release",
                "--host",
                host,
                "--port",
                port,
                "--credentials-id",
                credentials_id,
            ])
            .assert()
            .failure()
    };
    add("not-an-ip", "21", "").stderr(predicate::str::contains("host invalid"));
    add("10.0.0.5", "ftp", "").stderr(predicate::str::contains("port invalid"));
    add("10.0.0.5", "21", "missing")
        .stderr(predicate::str::contains("credential id 'missing' does not exist"));
    assert!(!tmp.path().join("servers.json").exists());
}

#[test]
fn test_quiet_suppresses_errors() {
    let tmp = tempfile::tempdir().unwrap();
    ftpscm()
        .args([
            "-q",
            "--registry",
            &path_arg(&tmp.path().join("servers.json")),
            "checkout",
            "--server",
            "missing",
            "--remote-path",
            "/pub",
            "--files",
            "a.txt",
            &path_arg(&tmp.path().join("workspace")),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_checkout_of_unknown_server_fails() {
    let tmp = tempfile::tempdir().unwrap();
    ftpscm()
        .args([
            "--registry",
            &path_arg(&tmp.path().join("servers.json")),
            "checkout",
            "--server",
            "missing",
            "--remote-path",
            "/pub",
            "--files",
            "a.txt",
            &path_arg(&tmp.path().join("workspace")),
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No available ftpServer: 'missing'"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_checkout_downloads_files() {
    let server = MockFtpServer::builder()
        .account("bob", "s3cret")
        .file("/pub/a.txt", "alpha")
        .file("/pub/b.txt", "bravo")
        .start()
        .await
        .unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let registry = tmp.path().join("servers.json");
    let credentials = tmp.path().join("credentials.json");
    let workspace = tmp.path().join("workspace");
    let changelog = tmp.path().join("changelog.xml");
    write_registry(&registry, &server, "release-ftp");
    write_credentials(&credentials);
    std::fs::create_dir_all(&workspace).unwrap();
    std::fs::write(workspace.join("stale.txt"), "old").unwrap();
    let output = run(vec![
        "--registry".into(),
        path_arg(&registry),
        "--credentials".into(),
        path_arg(&credentials),
        "--summary".into(),
        "checkout".into(),
        "--server".into(),
        "release".into(),
        "--remote-path".into(),
        "/pub".into(),
        "--files".into(),
        "a.txt, b.txt,".into(),
        "--clean".into(),
        "--changelog".into(),
        path_arg(&changelog),
        path_arg(&workspace),
    ])
    .await;
    output
        .assert()
        .success()
        .stdout(predicate::str::contains("File list of current workspace..."))
        .stdout(predicate::str::contains("Start cleaning the workspace..."))
        .stdout(predicate::str::contains("Successfully download file: a.txt"))
        .stdout(predicate::str::contains("Successfully download file: b.txt"))
        .stdout(predicate::str::contains("files downloaded: 2"));
    assert_eq!(std::fs::read_to_string(workspace.join("a.txt")).unwrap(), "alpha");
    assert_eq!(std::fs::read_to_string(workspace.join("b.txt")).unwrap(), "bravo");
    assert!(!workspace.join("stale.txt").exists());
    assert_eq!(std::fs::read_to_string(&changelog).unwrap(), "<log/>\n");
    assert_eq!(server.quit_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_checkout_reports_failed_file() {
    let server = MockFtpServer::builder()
        .file("/pub/a.txt", "alpha")
        .failing_file("/pub/b.txt")
        .start()
        .await
        .unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let registry = tmp.path().join("servers.json");
    let workspace = tmp.path().join("workspace");
    write_registry(&registry, &server, "");
    let output = run(vec![
        "--registry".into(),
        path_arg(&registry),
        "checkout".into(),
        "--server".into(),
        "release".into(),
        "--remote-path".into(),
        "/pub".into(),
        "--files".into(),
        "a.txt,b.txt".into(),
        path_arg(&workspace),
    ])
    .await;
    output
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Failed download file: b.txt"))
        .stderr(predicate::str::contains("Failed download file: b.txt"));
    assert!(workspace.join("a.txt").exists());
    assert_eq!(server.quit_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connection_command() {
    let server = MockFtpServer::builder()
        .account("bob", "s3cret")
        .start()
        .await
        .unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let credentials = tmp.path().join("credentials.json");
    write_credentials(&credentials);
    let connect = |credentials_id: &str| {
        vec![
            "--credentials".to_string(),
            path_arg(&credentials),
            "--registry".to_string(),
            path_arg(&tmp.path().join("servers.json")),
            "test-connection".to_string(),
            "--host".to_string(),
            server.host(),
            "--port".to_string(),
            server.port(),
            "--credentials-id".to_string(),
            credentials_id.to_string(),
        ]
    };
    run(connect("release-ftp"))
        .await
        .assert()
        .success()
        .stdout(predicate::str::contains("Connection success"));
    run(connect(""))
        .await
        .assert()
        .code(1)
        .stderr(predicate::str::contains("wrong username or password"));
}
