use cast_runtime::init_file_tracing;

#[test]
fn file_subscriber_writes_into_the_log_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let logs = dir.path().join("logs");

    let guard = init_file_tracing(&logs, "cast.log", "info").expect("log dir");
    assert!(guard.is_some());
    tracing::info!(target: "runtime::worker", "hello");
    drop(guard);

    let written = std::fs::read_to_string(logs.join("cast.log")).expect("log file");
    assert!(written.contains("hello"));
}
