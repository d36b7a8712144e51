//! Process-level behavior: exit status and the diagnostic log.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_txt-feeder");

/// Write a config that points at `port` on localhost.
fn write_config(dir: &Path, port: u16) -> std::path::PathBuf {
    let path = dir.join("feeder.toml");
    std::fs::write(
        &path,
        format!(
            r#"
                wait_secs = 1

                [influx]
                host = "127.0.0.1"
                port = {port}
                database = "lab"
                timeout_secs = 2
            "#
        ),
    )
    .unwrap();
    path
}

fn run(args: &[&str], config: &Path, log: &Path) -> Output {
    Command::new(BIN)
        .args(args)
        .arg("--config")
        .arg(config)
        .arg("--log-file")
        .arg(log)
        .env_remove("RUST_LOG")
        .env_remove("TXT_FEEDER_PASSWORD")
        .output()
        .expect("Failed to execute txt-feeder")
}

#[test]
fn help_lists_options() {
    let output = Command::new(BIN).arg("--help").output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--wait"), "Help should mention --wait");
    assert!(stdout.contains("--db"), "Help should mention --db");
    assert!(stdout.contains("--measurement"));
}

#[test]
fn missing_start_file_exits_non_zero() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), 9);
    let log = dir.path().join("feeder.log");
    let missing = dir.path().join("missing.txt");

    let output = run(&[missing.to_str().unwrap()], &config, &log);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("does not exist or is not a regular file"));
}

#[test]
fn malformed_timestamp_exits_non_zero_and_logs_line() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), 9);
    let log = dir.path().join("feeder.log");
    let bad = "mydatameasurement,host1,1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,2025-06-09T21:58";
    let start = dir.path().join("a.txt");
    std::fs::write(&start, format!("# logger started\n{bad}\n")).unwrap();

    let output = run(&[start.to_str().unwrap()], &config, &log);
    assert!(!output.status.success());

    let diagnostics = std::fs::read_to_string(&log).unwrap();
    assert!(diagnostics.contains(bad), "log should contain the line");
    assert!(
        diagnostics.contains("line_number=2"),
        "log should contain the line number"
    );
}

#[test]
fn rejected_write_exits_non_zero() {
    use httpmock::prelude::*;

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/write").query_param("db", "lab");
        then.status(404).body("{\"error\":\"database not found: \\\"lab\\\"\"}");
    });

    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), server.port());
    let log = dir.path().join("feeder.log");
    let start = dir.path().join("a.txt");
    std::fs::write(
        &start,
        "mydatameasurement,host1,1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,2025-06-09T21:58:12Z\n",
    )
    .unwrap();

    let output = run(&[start.to_str().unwrap()], &config, &log);
    assert!(!output.status.success());
    mock.assert();

    let diagnostics = std::fs::read_to_string(&log).unwrap();
    assert!(diagnostics.contains("database not found"));

    // One event from the sender, one with the file and line from the engine.
    let errors = diagnostics.lines().filter(|l| l.contains(" ERROR ")).count();
    assert_eq!(errors, 2, "diagnostics:\n{diagnostics}");
}

#[cfg(unix)]
#[test]
fn interrupt_exits_zero() {
    use std::process::Stdio;
    use std::time::{Duration, Instant};

    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), 9);
    let log = dir.path().join("feeder.log");
    let start = dir.path().join("a.txt");
    std::fs::write(&start, "# logger started\n# no records yet\n").unwrap();

    let mut child = Command::new(BIN)
        .arg(&start)
        .arg("--config")
        .arg(&config)
        .arg("--log-file")
        .arg(&log)
        .env_remove("RUST_LOG")
        .env_remove("TXT_FEEDER_PASSWORD")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to start txt-feeder");

    let deadline = Instant::now() + Duration::from_secs(5);
    while !std::fs::read_to_string(&log).is_ok_and(|d| d.contains("Processing file")) {
        assert!(Instant::now() < deadline, "txt-feeder never opened the start file");
        std::thread::sleep(Duration::from_millis(50));
    }
    // Let the signal handler register.
    std::thread::sleep(Duration::from_millis(300));

    let kill = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(kill.success());

    let deadline = Instant::now() + Duration::from_secs(5);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() >= deadline {
            child.kill().unwrap();
            panic!("txt-feeder did not stop after SIGINT");
        }
        std::thread::sleep(Duration::from_millis(50));
    };
    assert!(status.success(), "exit status: {status:?}");

    let diagnostics = std::fs::read_to_string(&log).unwrap();
    assert!(diagnostics.contains("Interrupted by user"));
    assert!(diagnostics.contains("Forwarder stopped"));
}
