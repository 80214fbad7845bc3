//! Console and client against a kernel served over localhost sockets

use cli_console::{ClientConfig, ClientError, InteractiveConsole, KernelClient};
use core_types::Identity;
use interactive_kernel::Kernel;
use ipc::Session;
use kernel_api::{Channel, KernelPorts};
use std::cell::RefCell;
use std::rc::Rc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tcp_transport::{TcpClientTransport, TcpKernelTransport};

const KEY: &[u8] = b"console-key";

/// Starts a kernel thread and returns a connected client transport
fn start_kernel(ports: Option<KernelPorts>) -> (TcpClientTransport, JoinHandle<u64>) {
    let server = TcpKernelTransport::bind("127.0.0.1", 0, 0, 0).unwrap();
    let bound = KernelPorts::new(
        server.port(Channel::Shell).unwrap(),
        server.port(Channel::IoPub).unwrap(),
        server.port(Channel::Stdin).unwrap(),
        0,
    );
    let identity = Identity::random();
    let transport = TcpClientTransport::connect("127.0.0.1", bound, identity.clone()).unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    while !(server.has_peer(Channel::Shell, &identity)
        && server.has_peer(Channel::Stdin, &identity)
        && server.subscriber_count() == 1)
    {
        assert!(Instant::now() < deadline, "kernel never saw the client");
        thread::sleep(Duration::from_millis(5));
    }

    let kernel = thread::spawn(move || {
        let mut kernel = Kernel::new(server, Session::new("kernel").with_key(KEY));
        if let Some(ports) = ports {
            kernel.record_ports(ports);
        }
        kernel.start().unwrap();
        kernel.execution_count()
    });
    (transport, kernel)
}

fn config() -> ClientConfig {
    ClientConfig::default()
        .with_key(KEY)
        .with_reply_timeout(Duration::from_secs(10))
        .with_output_grace(Duration::from_millis(300))
}

#[test]
fn test_execute_collects_output_and_result() {
    let (transport, kernel) = start_kernel(None);
    let mut client = KernelClient::new(transport, config());

    let reply = client.execute("print('hi')\nprint('oops', file=sys.stderr)\n6 * 7").unwrap();
    assert_eq!(reply.status(), Some("ok"));
    assert_eq!(reply.stream("stdout"), "hi\n");
    assert_eq!(reply.stream("stderr"), "oops\n");
    assert_eq!(reply.result(), Some("42"));

    let reply = client.execute("1/0").unwrap();
    assert_eq!(reply.status(), Some("error"));
    let error = reply.error().unwrap();
    assert_eq!(error.ename, "ZeroDivisionError");
    assert!(reply.outputs.iter().any(|m| m.msg_type() == "pyerr"));

    client.shutdown(false).unwrap();
    assert_eq!(kernel.join().unwrap(), 2);
}

#[test]
fn test_input_requests_reach_handler() {
    let (transport, kernel) = start_kernel(None);
    let prompts = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&prompts);
    let mut client = KernelClient::new(transport, config()).with_input_handler(move |prompt| {
        seen.borrow_mut().push(prompt.to_string());
        "ada".to_string()
    });

    let reply = client
        .execute("name = input('Name: ')\nprint('hello ' + name)")
        .unwrap();
    assert_eq!(reply.status(), Some("ok"));
    assert_eq!(reply.stream("stdout"), "hello ada\n");
    assert_eq!(*prompts.borrow(), vec!["Name: ".to_string()]);

    client.shutdown(false).unwrap();
    kernel.join().unwrap();
}

#[test]
fn test_introspection_requests() {
    let ports = KernelPorts::new(5550, 5551, 5552, 5553);
    let (transport, kernel) = start_kernel(Some(ports));
    let mut client = KernelClient::new(transport, config().with_output_grace(Duration::ZERO));

    client.execute("value = 1\nvalid = True").unwrap();
    assert_eq!(client.complete("va", "va").unwrap(), vec!["valid", "value"]);
    assert!(client.object_info("len").unwrap().starts_with("len(obj) -> int"));
    assert_eq!(client.object_info("nothing_here").unwrap(), "");
    assert_eq!(client.connect_info().unwrap(), Some(ports));

    client.shutdown(false).unwrap();
    kernel.join().unwrap();
}

#[test]
fn test_connect_info_without_recorded_ports() {
    let (transport, kernel) = start_kernel(None);
    let mut client = KernelClient::new(transport, config().with_output_grace(Duration::ZERO));

    assert_eq!(client.connect_info().unwrap(), None);

    client.shutdown(false).unwrap();
    kernel.join().unwrap();
}

#[test]
fn test_interactive_console_session() {
    let (transport, kernel) = start_kernel(None);
    let mut console = InteractiveConsole::new(KernelClient::new(transport, config()));

    assert_eq!(console.prompt(), "In [1]: ");
    assert_eq!(console.handle_line("x = 5").unwrap().text, "");
    assert_eq!(console.prompt(), "In [2]: ");

    assert_eq!(console.handle_line("x * 2").unwrap().text, "Out[2]: 10\n");
    assert_eq!(console.handle_line("print(x)").unwrap().text, "5\n");

    let failed = console.handle_line("1/0").unwrap().text;
    assert!(failed.starts_with("Traceback (most recent call last):\n"));
    assert!(failed.ends_with("ZeroDivisionError: division by zero\n"));

    assert_eq!(console.handle_line("   ").unwrap().text, "");
    assert!(console.handle_line("len?").unwrap().text.starts_with("len(obj) -> int"));
    assert_eq!(
        console.handle_line("missing?").unwrap().text,
        "Object `missing` not found.\n"
    );
    assert_eq!(console.handle_line("%complete zz").unwrap().text, "(no matches)\n");

    let response = console.handle_line("exit").unwrap();
    assert!(response.exit);
    assert_eq!(kernel.join().unwrap(), 4);
}

#[test]
fn test_reply_timeout_when_kernel_is_gone() {
    let (transport, kernel) = start_kernel(None);
    let mut client = KernelClient::new(
        transport,
        config()
            .with_reply_timeout(Duration::from_millis(200))
            .with_output_grace(Duration::ZERO),
    );
    client.shutdown(false).unwrap();
    kernel.join().unwrap();

    let err = client.execute("1").unwrap_err();
    assert!(matches!(
        err,
        ClientError::Timeout { .. } | ClientError::Kernel(_) | ClientError::Transport(_)
    ));
}
