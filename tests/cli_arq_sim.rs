use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "arq-sim-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn run(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_arq_sim"))
        .args(args)
        .output()
        .expect("run arq_sim")
}

fn json_report(stdout: &[u8]) -> Value {
    let raw = String::from_utf8_lossy(stdout);
    let line = raw.lines().last().expect("stdout should contain a report");
    serde_json::from_str(line).expect("parse report json")
}

#[test]
fn lossless_go_back_n_reports_exact_send_count() {
    let output = run(&[
        "--protocol",
        "go-back-n",
        "--window",
        "2",
        "--packet-loss",
        "0",
        "--corruption",
        "0",
        "--ack-loss",
        "0",
        "--json",
    ]);
    assert!(
        output.status.success(),
        "arq_sim failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let v = json_report(&output.stdout);
    assert_eq!(v.get("success").and_then(Value::as_bool), Some(true));
    let stats = v.get("stats").expect("stats");
    assert_eq!(stats.get("total_sent").and_then(Value::as_u64), Some(5));
    assert_eq!(stats.get("retransmissions").and_then(Value::as_u64), Some(0));
    assert_eq!(
        stats.get("protocol").and_then(Value::as_str),
        Some("Go-Back-N (window=2)")
    );
}

#[test]
fn lossy_selective_repeat_still_succeeds() {
    let output = run(&[
        "--protocol",
        "selective-repeat",
        "--message",
        "HelloWorldHelloWorld",
        "--seed",
        "7",
        "--json",
    ]);
    assert!(output.status.success());
    let v = json_report(&output.stdout);
    assert_eq!(v.get("success").and_then(Value::as_bool), Some(true));
    assert_eq!(
        v.pointer("/stats/useful_packets").and_then(Value::as_u64),
        Some(10)
    );
}

#[test]
fn config_file_and_trace_output() {
    let dir = unique_temp_dir("trace");
    let config = dir.join("config.json");
    fs::write(
        &config,
        r#"{ "protocol": "stop_and_wait", "chunk_size": 3, "faults": { "packet_loss": 0.3 }, "seed": 2 }"#,
    )
    .expect("write config");
    let trace = dir.join("trace.json");

    let output = run(&[
        "--config",
        config.to_str().unwrap(),
        "--trace-json",
        trace.to_str().unwrap(),
        "--json",
    ]);
    assert!(
        output.status.success(),
        "arq_sim failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let v = json_report(&output.stdout);
    assert_eq!(
        v.pointer("/stats/protocol").and_then(Value::as_str),
        Some("Stop-and-Wait")
    );

    let raw = fs::read_to_string(&trace).expect("read trace.json");
    let events: Value = serde_json::from_str(&raw).expect("parse trace.json");
    let arr = events.as_array().expect("trace.json must be a JSON array");
    assert_eq!(
        arr.last().and_then(|e| e.get("kind")).and_then(Value::as_str),
        Some("done")
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn exhausted_budget_exits_with_failure() {
    let output = run(&["--packet-loss", "1", "--max-iterations", "20"]);
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("success=false"), "stdout={stdout}");
}

#[test]
fn invalid_probability_is_reported() {
    let output = run(&["--corruption", "1.5"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("corruption must be in [0.0, 1.0]"), "stderr={stderr}");
}
