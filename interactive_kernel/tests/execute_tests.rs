//! Execute flow: results, errors, streams, the abort queue and raw input

use interactive_kernel::test_utils::{msg_types, stream_text, KernelHarness};
use interactive_kernel::{KernelConfig, KernelState};
use kernel_api::{Clock, Duration};
use script_engine::Value;
use serde_json::json;

#[test]
fn test_namespace_persists_between_requests() {
    let mut harness = KernelHarness::new();
    harness.execute("x = 1").unwrap();
    harness.iopub().unwrap();
    harness.shell().unwrap();

    harness.execute("x").unwrap();
    let iopub = harness.iopub().unwrap();
    assert_eq!(msg_types(&iopub), vec!["pyin", "pyout"]);
    assert_eq!(
        iopub[1].content,
        json!({"data": {"text/plain": "1"}, "execution_count": 2})
    );
    assert_eq!(harness.kernel.namespace().get("x"), Some(&Value::Int(1)));
}

#[test]
fn test_successful_reply_and_pyin() {
    let mut harness = KernelHarness::new();
    let request = harness.execute("y = 2").unwrap();

    let shell = harness.shell().unwrap();
    assert_eq!(shell.len(), 1);
    assert_eq!(shell[0].msg_type(), "execute_reply");
    assert_eq!(shell[0].content, json!({"status": "ok", "payload": {}}));
    assert_eq!(shell[0].parent_header.as_ref(), Some(&request.header));

    let iopub = harness.iopub().unwrap();
    assert_eq!(msg_types(&iopub), vec!["pyin"]);
    assert_eq!(iopub[0].content, json!({"code": "y = 2", "execution_count": 1}));
    assert_eq!(iopub[0].parent_header.as_ref(), Some(&request.header));

    assert_eq!(harness.kernel.history(), &["y = 2".to_string()]);
    assert_eq!(harness.kernel.execution_count(), 1);
    assert_eq!(harness.kernel.state(), KernelState::Idle);
}

#[test]
fn test_none_result_is_not_displayed() {
    let mut harness = KernelHarness::new();
    harness.execute("None").unwrap();
    assert_eq!(msg_types(&harness.iopub().unwrap()), vec!["pyin"]);
}

#[test]
fn test_output_streams_are_tagged_with_request() {
    let mut harness = KernelHarness::new();
    let request = harness.execute("print('hello')").unwrap();

    let iopub = harness.iopub().unwrap();
    assert_eq!(msg_types(&iopub), vec!["pyin", "stream"]);
    assert_eq!(iopub[1].content, json!({"name": "stdout", "data": "hello\n"}));
    assert_eq!(iopub[1].parent_header.as_ref(), Some(&request.header));
}

#[test]
fn test_stderr_is_flushed_before_stdout() {
    let mut harness = KernelHarness::new();
    harness
        .execute("print('out')\nprint('err', file=sys.stderr)")
        .unwrap();

    let streams: Vec<String> = harness
        .iopub()
        .unwrap()
        .iter()
        .filter(|message| message.msg_type() == "stream")
        .filter_map(|message| message.content_str("name").map(str::to_string))
        .collect();
    assert_eq!(streams, vec!["stderr", "stdout"]);
}

#[test]
fn test_output_of_each_request_is_attributed_to_it() {
    let mut harness = KernelHarness::new();
    let first = harness.send_execute("print('a')").unwrap();
    let second = harness.send_execute("print('b')").unwrap();
    harness.run().unwrap();

    let streams: Vec<_> = harness
        .iopub()
        .unwrap()
        .into_iter()
        .filter(|message| message.msg_type() == "stream")
        .collect();
    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0].parent_id(), Some(first.msg_id()));
    assert_eq!(streams[1].parent_id(), Some(second.msg_id()));
}

#[test]
fn test_runtime_error_reports_pyerr_and_error_reply() {
    let mut harness = KernelHarness::new();
    harness.execute("a = 1\n1/0").unwrap();

    let iopub = harness.iopub().unwrap();
    assert_eq!(msg_types(&iopub), vec!["pyin", "pyerr"]);
    let pyerr = &iopub[1].content;
    assert_eq!(pyerr["status"], "error");
    assert_eq!(pyerr["ename"], "ZeroDivisionError");
    assert_eq!(pyerr["evalue"], "division by zero");
    let traceback = pyerr["traceback"].as_array().unwrap();
    assert_eq!(traceback[0], "Traceback (most recent call last):\n");
    assert_eq!(
        traceback.last().unwrap(),
        "ZeroDivisionError: division by zero\n"
    );

    let shell = harness.shell().unwrap();
    assert_eq!(shell[0].content["status"], "error");
    assert_eq!(shell[0].content["ename"], "ZeroDivisionError");

    // Side effects before the failing statement are kept.
    assert_eq!(harness.kernel.namespace().get("a"), Some(&Value::Int(1)));
}

#[test]
fn test_runtime_error_aborts_queued_requests() {
    let mut harness = KernelHarness::new();
    let failing = harness.send_execute("1/0").unwrap();
    let queued_execute = harness.send_execute("x = 5").unwrap();
    let queued_complete = harness
        .send("complete_request", json!({"line": "pr", "text": "pr"}))
        .unwrap();
    harness.run().unwrap();

    let shell = harness.shell().unwrap();
    assert_eq!(
        msg_types(&shell),
        vec!["execute_reply", "execute_reply", "complete_reply"]
    );
    assert_eq!(shell[0].parent_id(), Some(failing.msg_id()));
    assert_eq!(shell[0].content["status"], "error");
    assert_eq!(shell[1].parent_id(), Some(queued_execute.msg_id()));
    assert_eq!(shell[1].content, json!({"status": "aborted"}));
    assert_eq!(shell[2].parent_id(), Some(queued_complete.msg_id()));
    assert_eq!(shell[2].content, json!({"status": "aborted"}));

    // No code ran for the aborted request.
    assert!(!harness.kernel.namespace().contains("x"));
    assert_eq!(harness.kernel.history().len(), 1);
    assert_eq!(msg_types(&harness.iopub().unwrap()), vec!["pyin", "pyerr"]);

    // One poll pause per aborted request.
    assert_eq!(
        harness.clock.now().as_nanos(),
        Duration::from_millis(200).as_nanos()
    );
    assert_eq!(harness.kernel.state(), KernelState::Idle);
}

#[test]
fn test_requests_after_the_drain_run_normally() {
    let mut harness = KernelHarness::new();
    harness.execute("1/0").unwrap();
    harness.shell().unwrap();

    harness.execute("z = 3").unwrap();
    let shell = harness.shell().unwrap();
    assert_eq!(shell[0].content["status"], "ok");
    assert!(harness.kernel.namespace().contains("z"));
}

#[test]
fn test_compile_error_does_not_abort_backlog() {
    let mut harness = KernelHarness::new();
    harness.send_execute("x = = 1").unwrap();
    harness.send_execute("y = 2").unwrap();
    harness.run().unwrap();

    let shell = harness.shell().unwrap();
    assert_eq!(shell.len(), 2);
    assert_eq!(shell[0].content["status"], "error");
    assert_eq!(shell[0].content["ename"], "SyntaxError");
    assert_eq!(shell[1].content["status"], "ok");
    assert!(harness.kernel.namespace().contains("y"));

    let iopub = harness.iopub().unwrap();
    assert_eq!(msg_types(&iopub), vec!["pyin", "pyerr", "pyin"]);
    assert_eq!(iopub[1].content["ename"], "SyntaxError");
}

#[test]
fn test_compile_error_kinds_are_reported() {
    let cases = [
        ("99999999999999999999999", "OverflowError"),
        ("'\\x4'", "ValueError"),
        ("x = 1\0", "TypeError"),
    ];
    for (code, ename) in cases {
        let mut harness = KernelHarness::new();
        harness.execute(code).unwrap();
        let shell = harness.shell().unwrap();
        assert_eq!(shell[0].content["ename"], ename, "code {:?}", code);
    }
}

#[test]
fn test_runaway_expression_chain_is_memory_error() {
    let mut harness = KernelHarness::new();
    harness.send_execute(&format!("x = 1{}", "+1".repeat(20_000))).unwrap();
    harness.send_execute("y = 2").unwrap();
    harness.run().unwrap();

    let shell = harness.shell().unwrap();
    assert_eq!(shell.len(), 2);
    assert_eq!(shell[0].content["status"], "error");
    assert_eq!(shell[0].content["ename"], "MemoryError");
    assert_eq!(shell[1].content["status"], "ok");
    assert!(!harness.kernel.namespace().contains("x"));

    let iopub = harness.iopub().unwrap();
    assert_eq!(msg_types(&iopub), vec!["pyin", "pyerr", "pyin"]);
}

#[test]
fn test_malformed_execute_gets_no_reply() {
    let mut harness = KernelHarness::new();
    harness.send("execute_request", json!({"source": "1"})).unwrap();
    harness.run().unwrap();

    assert!(harness.shell().unwrap().is_empty());
    assert!(harness.iopub().unwrap().is_empty());
    assert_eq!(harness.kernel.execution_count(), 0);
}

#[test]
fn test_input_round_trip() {
    let mut harness = KernelHarness::new();
    harness.queue_input("Ada").unwrap();
    let request = harness
        .execute("name = input('Who? ')\nprint('hi ' + name)")
        .unwrap();

    let stdin = harness.stdin().unwrap();
    assert_eq!(msg_types(&stdin), vec!["input_request"]);
    assert_eq!(stdin[0].content, json!({"prompt": "Who? "}));
    assert_eq!(stdin[0].parent_header.as_ref(), Some(&request.header));

    assert_eq!(stream_text(&harness.iopub().unwrap(), "stdout"), "hi Ada\n");
    assert_eq!(harness.shell().unwrap()[0].content["status"], "ok");
}

#[test]
fn test_pending_output_is_flushed_before_input_request() {
    let mut harness = KernelHarness::new();
    harness.queue_input("").unwrap();
    harness.execute("print('question')\nanswer = raw_input()").unwrap();

    let iopub = harness.iopub().unwrap();
    assert_eq!(msg_types(&iopub), vec!["pyin", "stream"]);
    assert_eq!(stream_text(&iopub, "stdout"), "question\n");
}

#[test]
fn test_malformed_input_reply_becomes_empty_string() {
    let mut harness = KernelHarness::new();
    let bogus = harness.client.msg("input_reply", json!({"answer": 1}), None);
    harness
        .transport
        .inject(
            &harness.client,
            kernel_api::Channel::Stdin,
            &bogus,
            std::slice::from_ref(&harness.identity),
        )
        .unwrap();

    harness.execute("value = input()").unwrap();
    assert_eq!(harness.shell().unwrap()[0].content["status"], "ok");
    assert_eq!(harness.kernel.namespace().get("value"), Some(&Value::str("")));
}

#[test]
fn test_missing_input_reply_raises_eof_error() {
    let mut harness = KernelHarness::new();
    harness.execute("input()").unwrap();

    let shell = harness.shell().unwrap();
    assert_eq!(shell[0].content["ename"], "EOFError");
}

#[test]
fn test_custom_flush_interval_is_used() {
    let config = KernelConfig::default().with_flush_interval(Duration::from_secs(10));
    let mut harness = KernelHarness::with_config(config);
    harness.execute("print('a')\nprint('b')").unwrap();
    let streams: Vec<_> = harness
        .iopub()
        .unwrap()
        .into_iter()
        .filter(|message| message.msg_type() == "stream")
        .collect();
    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].content["data"], "a\nb\n");
}
