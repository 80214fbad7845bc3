//! Completion, introspection, connection info, shutdown and dispatch

use interactive_kernel::test_utils::{msg_types, KernelHarness};
use interactive_kernel::Flow;
use ipc::Session;
use kernel_api::{Channel, Clock, KernelPorts};
use serde_json::json;

#[test]
fn test_complete_request_matches_namespace_and_builtins() {
    let mut harness = KernelHarness::new();
    harness.execute("value = 1; valid = 2").unwrap();
    harness.shell().unwrap();

    let request = harness
        .send("complete_request", json!({"line": "x = val", "text": "val"}))
        .unwrap();
    harness.run().unwrap();

    let shell = harness.shell().unwrap();
    assert_eq!(shell[0].msg_type(), "complete_reply");
    assert_eq!(shell[0].parent_id(), Some(request.msg_id()));
    assert_eq!(
        shell[0].content,
        json!({"matches": ["valid", "value"], "status": "ok"})
    );
}

#[test]
fn test_complete_request_attribute_matches() {
    let mut harness = KernelHarness::new();
    harness
        .send("complete_request", json!({"line": "math.sq", "text": ""}))
        .unwrap();
    harness.run().unwrap();
    assert_eq!(
        harness.shell().unwrap()[0].content["matches"],
        json!(["math.sqrt"])
    );
}

#[test]
fn test_complete_request_with_missing_fields_still_replies() {
    let mut harness = KernelHarness::new();
    harness.send("complete_request", json!({})).unwrap();
    harness.run().unwrap();

    let shell = harness.shell().unwrap();
    assert_eq!(shell[0].content["status"], "ok");
    assert!(shell[0].content["matches"].is_array());
}

#[test]
fn test_object_info_returns_deepest_resolved_docstring() {
    let mut harness = KernelHarness::new();
    harness
        .execute(
            "cfg = namespace()\ncfg.__doc__ = 'Settings.'\n\
             cfg.inner = namespace()\ncfg.inner.__doc__ = 'Inner settings.'",
        )
        .unwrap();
    harness.shell().unwrap();

    harness
        .send("object_info_request", json!({"oname": "cfg.inner.missing"}))
        .unwrap();
    harness
        .send("object_info_request", json!({"oname": "cfg"}))
        .unwrap();
    harness.run().unwrap();

    let shell = harness.shell().unwrap();
    assert_eq!(msg_types(&shell), vec!["object_info_reply", "object_info_reply"]);
    assert_eq!(shell[0].content, json!({"docstring": "Inner settings."}));
    assert_eq!(shell[1].content, json!({"docstring": "Settings."}));
}

#[test]
fn test_object_info_for_builtins_and_unknown_names() {
    let mut harness = KernelHarness::new();
    harness
        .send("object_info_request", json!({"oname": "math.sqrt"}))
        .unwrap();
    harness
        .send("object_info_request", json!({"oname": "nowhere.near"}))
        .unwrap();
    harness.send("object_info_request", json!({})).unwrap();
    harness.run().unwrap();

    let shell = harness.shell().unwrap();
    assert!(shell[0].content["docstring"]
        .as_str()
        .unwrap()
        .starts_with("sqrt(x)"));
    assert_eq!(shell[1].content["docstring"], "");
    assert_eq!(shell[2].content["docstring"], "");
}

#[test]
fn test_connect_request_without_recorded_ports() {
    let mut harness = KernelHarness::new();
    harness.send("connect_request", json!({})).unwrap();
    harness.run().unwrap();

    let shell = harness.shell().unwrap();
    assert_eq!(shell[0].msg_type(), "connect_reply");
    assert_eq!(shell[0].content, json!({}));
}

#[test]
fn test_connect_request_returns_recorded_ports() {
    let mut harness = KernelHarness::new();
    harness
        .kernel
        .record_ports(KernelPorts::new(5000, 5001, 5002, 5003));
    harness.send("connect_request", json!({})).unwrap();
    harness.run().unwrap();

    assert_eq!(
        harness.shell().unwrap()[0].content,
        json!({"xrep_port": 5000, "pub_port": 5001, "req_port": 5002, "hb_port": 5003})
    );
}

#[test]
fn test_shutdown_replies_on_shell_and_iopub() {
    let mut harness = KernelHarness::new();
    let request = harness
        .send("shutdown_request", json!({"restart": false}))
        .unwrap();
    assert_eq!(harness.run().unwrap(), Flow::Shutdown);

    let shell = harness.shell().unwrap();
    assert_eq!(msg_types(&shell), vec!["shutdown_reply"]);
    assert_eq!(shell[0].content, json!({"restart": false}));
    assert_eq!(shell[0].parent_id(), Some(request.msg_id()));

    let iopub = harness.iopub().unwrap();
    assert_eq!(msg_types(&iopub), vec!["shutdown_reply"]);
    assert_eq!(iopub[0].content, json!({"restart": false}));

    assert_eq!(harness.clock.now().as_nanos(), 100_000_000);
}

#[test]
fn test_start_serves_until_shutdown() {
    let mut harness = KernelHarness::new();
    harness.send_execute("x = 41 + 1").unwrap();
    harness.send("shutdown_request", json!({})).unwrap();
    harness.send_execute("never = 1").unwrap();

    harness.kernel.start().unwrap();

    assert!(harness.kernel.namespace().contains("x"));
    assert!(!harness.kernel.namespace().contains("never"));
    assert_eq!(harness.transport.pending_inbound(Channel::Shell), 1);
}

#[test]
fn test_unknown_request_is_ignored() {
    let mut harness = KernelHarness::new();
    harness.send("history_request", json!({})).unwrap();
    harness.send_execute("after = 1").unwrap();
    harness.run().unwrap();

    let shell = harness.shell().unwrap();
    assert_eq!(msg_types(&shell), vec!["execute_reply"]);
    assert!(harness.kernel.namespace().contains("after"));
}

#[test]
fn test_requests_with_bad_signature_are_dropped() {
    let mut harness = KernelHarness::new();
    let mut intruder = Session::new("intruder").with_key(b"wrong-key".to_vec());
    let request = intruder.msg("execute_request", json!({"code": "owned = 1"}), None);
    harness
        .transport
        .inject(&intruder, Channel::Shell, &request, &[])
        .unwrap();
    harness.run().unwrap();

    assert!(harness.shell().unwrap().is_empty());
    assert!(!harness.kernel.namespace().contains("owned"));
}

#[test]
fn test_replies_are_routed_to_requesting_identity() {
    let mut harness = KernelHarness::new();
    harness.send_execute("1").unwrap();
    harness.run().unwrap();

    let replies = harness
        .transport
        .take_messages(&harness.client, Channel::Shell)
        .unwrap();
    assert_eq!(replies[0].0, vec![harness.identity.clone()]);
}
