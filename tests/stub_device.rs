//! End-to-end session scenarios against a scripted stand-in for the device.
//!
//! The stub listens on a loopback port, performs the login exchange and then
//! answers command lines from a per-test handler. Multi-page responses are
//! served one screen at a time, advancing on the single-space keystroke just
//! like the real pagination banner.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use olterm::config::SessionOptions;
use olterm::device::ShellMode;
use olterm::error::OltError;
use olterm::session::{Classification, OltConnectionManager, OltSession, WorkflowOutcome};

const BANNER: &str = "\r\n  Huawei Integrated Access Software (MA5683T).\r\n  Copyright(C) Huawei Technologies Co., Ltd.\r\n\r\nMA5683T>";
const MORE: &str = "\r\n  ---- More ( Press 'Q' to break ) ----\r\n";

#[derive(Clone, Copy)]
enum LoginScript {
    /// Accept any credentials and emit the banner plus user prompt.
    Accept,
    /// Emit this text after the password and close the connection.
    Custom(&'static str),
    /// Accept the TCP connection but never write anything.
    Silent,
}

type Handler = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

fn empty_handler() -> Handler {
    Arc::new(|_| Vec::new())
}

fn prompt_for(depth: u32) -> String {
    match depth {
        0 => "MA5683T>",
        1 => "MA5683T#",
        2 => "MA5683T(config)#",
        _ => "MA5683T(config-if-gpon-0/0)#",
    }
    .to_string()
}

/// Handler that tracks mode depth and answers the provisioning flow.
fn provisioning_handler() -> Handler {
    let depth = Arc::new(Mutex::new(0u32));
    Arc::new(move |command| {
        let mut depth = depth.lock().expect("depth lock");
        match command {
            "" => vec![prompt_for(*depth)],
            "enable" => {
                *depth = 1;
                vec![prompt_for(*depth)]
            }
            "config" => {
                *depth = 2;
                vec![prompt_for(*depth)]
            }
            "interface gpon 0/0" => {
                *depth = 3;
                vec![prompt_for(*depth)]
            }
            "quit" => {
                *depth = depth.saturating_sub(1);
                vec![prompt_for(*depth)]
            }
            cmd if cmd.starts_with("ont add ") => vec![format!(
                "  Number of ONTs that can be added: 1, success: 1\r\n  ONT added successfully\r\n{}",
                prompt_for(*depth)
            )],
            "display ont info 5 1" => vec![format!(
                "  F/S/P   ONT-ID   SN                 Control-flag  Run-state\r\n  0/0/5   1        45485443BA058ED8   active        online\r\n{}",
                prompt_for(*depth)
            )],
            _ => vec![format!("  Unknown command\r\n{}", prompt_for(*depth))],
        }
    })
}

async fn read_line(socket: &mut TcpStream, buf: &mut String) -> Option<String> {
    loop {
        if let Some(pos) = buf.find('\n') {
            let line: String = buf.drain(..=pos).collect();
            return Some(line.trim().to_string());
        }
        let mut bytes = [0u8; 1024];
        match socket.read(&mut bytes).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => buf.push_str(&String::from_utf8_lossy(&bytes[..n])),
        }
    }
}

/// Spawns the stub, returning its address and the command lines it received.
async fn spawn_stub(login: LoginScript, handler: Handler) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    let commands = Arc::new(Mutex::new(Vec::new()));
    let log = commands.clone();

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };

        if let LoginScript::Silent = login {
            // Hold the socket open without speaking.
            let mut bytes = [0u8; 1024];
            while let Ok(n) = socket.read(&mut bytes).await {
                if n == 0 {
                    return;
                }
            }
            return;
        }

        let mut buf = String::new();
        if socket.write_all(b">>User name:").await.is_err() {
            return;
        }
        if read_line(&mut socket, &mut buf).await.is_none() {
            return;
        }
        if socket.write_all(b">>User password:").await.is_err() {
            return;
        }
        if read_line(&mut socket, &mut buf).await.is_none() {
            return;
        }
        match login {
            LoginScript::Accept => {
                if socket.write_all(BANNER.as_bytes()).await.is_err() {
                    return;
                }
            }
            LoginScript::Custom(text) => {
                let _ = socket.write_all(text.as_bytes()).await;
                return;
            }
            LoginScript::Silent => unreachable!(),
        }

        let mut pending: VecDeque<String> = VecDeque::new();
        let mut bytes = [0u8; 1024];
        loop {
            let mut acted = false;
            if !pending.is_empty() {
                if let Some(pos) = buf.find(' ') {
                    buf.replace_range(pos..pos + 1, "");
                    let page = pending.pop_front().expect("pending page");
                    if socket.write_all(page.as_bytes()).await.is_err() {
                        return;
                    }
                    if !pending.is_empty() && socket.write_all(MORE.as_bytes()).await.is_err() {
                        return;
                    }
                    acted = true;
                }
            } else if let Some(pos) = buf.find('\n') {
                let line: String = buf.drain(..=pos).collect();
                let command = line.trim().to_string();
                if !command.is_empty() {
                    if let Ok(mut log) = log.lock() {
                        log.push(command.clone());
                    }
                }
                let mut pages = handler(&command);
                if !pages.is_empty() {
                    let first = pages.remove(0);
                    if socket.write_all(first.as_bytes()).await.is_err() {
                        return;
                    }
                    if !pages.is_empty() {
                        if socket.write_all(MORE.as_bytes()).await.is_err() {
                            return;
                        }
                        pending.extend(pages);
                    }
                }
                acted = true;
            }
            if acted {
                continue;
            }
            match socket.read(&mut bytes).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.push_str(&String::from_utf8_lossy(&bytes[..n])),
            }
        }
    });

    (addr, commands)
}

async fn connect(addr: SocketAddr) -> Result<OltSession, OltError> {
    OltSession::connect(
        &addr.ip().to_string(),
        addr.port(),
        "admin",
        "admin",
        SessionOptions::fast(),
    )
    .await
}

#[tokio::test]
async fn login_succeeds_against_banner_and_prompt() {
    let (addr, _) = spawn_stub(LoginScript::Accept, provisioning_handler()).await;

    let session = connect(addr).await.expect("login should succeed");
    assert!(session.is_authenticated());
    assert_eq!(session.mode(), &ShellMode::User);
    assert!(session.is_alive());
}

#[tokio::test]
async fn invalid_credentials_are_classified() {
    let (addr, _) = spawn_stub(
        LoginScript::Custom("  Username or password invalid.\r\n\r\n>>User name:"),
        empty_handler(),
    )
    .await;

    let err = match connect(addr).await {
        Ok(_) => panic!("login should fail"),
        Err(err) => err,
    };
    assert!(matches!(err, OltError::InvalidCredentials));
}

#[tokio::test]
async fn lockout_outranks_invalid_credentials() {
    let (addr, _) = spawn_stub(
        LoginScript::Custom(
            "  Username or password invalid.\r\n  Reenter times have reached the upper limit.\r\n",
        ),
        empty_handler(),
    )
    .await;

    let err = match connect(addr).await {
        Ok(_) => panic!("login should fail"),
        Err(err) => err,
    };
    assert!(matches!(err, OltError::Lockout));
}

#[tokio::test]
async fn unrecognized_login_response_is_a_connection_error() {
    let (addr, _) = spawn_stub(
        LoginScript::Custom("###### unexpected maintenance banner ######"),
        empty_handler(),
    )
    .await;

    let err = match connect(addr).await {
        Ok(_) => panic!("login should fail"),
        Err(err) => err,
    };
    assert!(matches!(err, OltError::ConnectionError(_)));
}

#[tokio::test]
async fn silent_device_is_a_connection_error() {
    let (addr, _) = spawn_stub(LoginScript::Silent, empty_handler()).await;

    let err = match connect(addr).await {
        Ok(_) => panic!("login should fail"),
        Err(err) => err,
    };
    match err {
        OltError::ConnectionError(msg) => assert!(msg.contains("username prompt")),
        other => panic!("unexpected error type: {other}"),
    }
}

#[tokio::test]
async fn register_ont_provisions_verifies_and_restores_user_shell() {
    let (addr, commands) = spawn_stub(LoginScript::Accept, provisioning_handler()).await;
    let mut session = connect(addr).await.expect("login");

    let report = session
        .register_ont("0/0", "5", "1", "45485443BA058ED8", "test", "10", "10")
        .await
        .expect("workflow should run");

    assert_eq!(report.outcome, WorkflowOutcome::Success);
    assert!(report.output.contains("ONT added successfully"));
    assert_eq!(session.mode(), &ShellMode::User);

    let log = commands.lock().expect("command log");
    assert!(log.contains(&"ont add 5 1 sn-auth 45485443BA058ED8 omci ont-lineprofile-id 10 ont-srvprofile-id 10 desc test".to_string()));
    assert!(log.contains(&"display ont info 5 1".to_string()));
    // Deepest nesting is three levels, each workflow pass unwinds fully.
    assert!(log.iter().filter(|c| c.as_str() == "quit").count() <= 8);
}

#[tokio::test]
async fn malformed_identifiers_are_rejected_before_any_io() {
    let (addr, commands) = spawn_stub(LoginScript::Accept, provisioning_handler()).await;
    let mut session = connect(addr).await.expect("login");

    let cases = [
        session
            .register_ont("00", "5", "1", "45485443BA058ED8", "test", "10", "10")
            .await,
        session
            .register_ont("0/0", "17", "1", "45485443BA058ED8", "test", "10", "10")
            .await,
        session
            .register_ont("0/0", "5", "129", "45485443BA058ED8", "test", "10", "10")
            .await,
        session
            .register_ont("0/0", "5", "1", "short", "test", "10", "10")
            .await,
        session
            .verify_ont_registration("x/y", "5", "1", "45485443BA058ED8")
            .await,
        session.ont_status("0/0/0", "1").await,
        session.ont_status("0/0", "0").await,
        session.board_status("9").await,
    ];
    for result in cases {
        match result {
            Err(OltError::ValidationError(_)) => {}
            Ok(_) => panic!("malformed input should be rejected"),
            Err(other) => panic!("unexpected error type: {other}"),
        }
    }

    let log = commands.lock().expect("command log");
    assert!(log.is_empty(), "validation failures must not reach the wire");
}

#[tokio::test]
async fn paginated_listing_is_fully_concatenated() {
    let handler: Handler = Arc::new(|command| match command {
        "display board 0/0" => vec![
            "  0/0/1  1  online".to_string(),
            "  0/0/2  2  online".to_string(),
            "  0/0/3  3  online".to_string(),
            "  0/0/4  4  online\r\nMA5683T>".to_string(),
        ],
        _ => vec!["MA5683T>".to_string()],
    });
    let (addr, _) = spawn_stub(LoginScript::Accept, handler).await;
    let mut session = connect(addr).await.expect("login");

    let result = session
        .execute("display board 0/0", Duration::from_millis(60))
        .await
        .expect("execute");

    assert_eq!(result.classification, Classification::Ok);
    assert_eq!(result.raw.matches("---- More").count(), 3);
    for row in ["0/0/1", "0/0/2", "0/0/3", "0/0/4"] {
        assert!(result.text.contains(row), "missing row {row}");
    }
    assert!(!result.text.contains("More"));
}

#[tokio::test]
async fn pagination_loop_stops_at_the_iteration_cap() {
    let handler: Handler = Arc::new(|command| match command {
        "display board 0/0" => (1..=13)
            .map(|n| format!("  0/0/{n}  {n}  online"))
            .collect(),
        _ => vec!["MA5683T>".to_string()],
    });
    let (addr, _) = spawn_stub(LoginScript::Accept, handler).await;
    let mut session = connect(addr).await.expect("login");

    let result = session
        .execute("display board 0/0", Duration::from_millis(60))
        .await
        .expect("execute");

    // Cap hit with the banner still showing: truncation is flagged instead
    // of looping forever.
    assert_eq!(result.classification, Classification::Ambiguous);
}

#[tokio::test]
async fn silent_command_response_is_a_timeout() {
    let handler: Handler = Arc::new(|command| match command {
        "display board 0/0" => Vec::new(),
        _ => vec!["MA5683T>".to_string()],
    });
    let (addr, _) = spawn_stub(LoginScript::Accept, handler).await;
    let mut session = connect(addr).await.expect("login");

    let result = session
        .execute("display board 0/0", Duration::from_millis(40))
        .await
        .expect("execute");
    assert_eq!(result.classification, Classification::Timeout);
}

#[tokio::test]
async fn rejected_command_fails_board_status() {
    let handler: Handler = Arc::new(|command| match command {
        "display board 9/9" => vec!["  Parameter error\r\nMA5683T>".to_string()],
        _ => vec!["MA5683T>".to_string()],
    });
    let (addr, _) = spawn_stub(LoginScript::Accept, handler).await;
    let mut session = connect(addr).await.expect("login");

    let report = session.board_status("9/9").await.expect("workflow");
    assert_eq!(report.outcome, WorkflowOutcome::Failed);
}

#[tokio::test]
async fn board_status_reduces_output_to_the_port_table() {
    let handler: Handler = Arc::new(|command| match command {
        "display board 0/0" => vec![
            "  -----------------------------\r\n  F/S/P  ONT-ID  Run state\r\n  0/0/1  1       online\r\n  0/0/2  2       offline\r\n\r\n  total: 2\r\nMA5683T>".to_string(),
        ],
        _ => vec!["MA5683T>".to_string()],
    });
    let (addr, _) = spawn_stub(LoginScript::Accept, handler).await;
    let mut session = connect(addr).await.expect("login");

    let report = session.board_status("0/0").await.expect("workflow");
    assert_eq!(report.outcome, WorkflowOutcome::Success);
    assert_eq!(report.output, "0/0/1  1       online\n0/0/2  2       offline");
}

#[tokio::test]
async fn exit_to_top_unwinds_within_the_attempt_cap() {
    let (addr, commands) = spawn_stub(LoginScript::Accept, provisioning_handler()).await;
    let mut session = connect(addr).await.expect("login");

    session.enter_enable().await.expect("enable");
    session.enter_config().await.expect("config");
    let board = "0/0".parse().expect("board id");
    session.enter_interface(&board).await.expect("interface");
    assert_eq!(session.mode(), &ShellMode::Interface(board));

    session.exit_to_top().await.expect("exit to top");
    assert_eq!(session.mode(), &ShellMode::User);

    let log = commands.lock().expect("command log");
    let quits = log.iter().filter(|c| c.as_str() == "quit").count();
    assert!(quits <= 4, "{quits} quits exceed the attempt cap");
    assert_eq!(quits, 3);
}

#[tokio::test]
async fn logout_answers_the_confirmation_and_blocks_further_commands() {
    let handler: Handler = {
        let depth = Arc::new(Mutex::new(0u32));
        Arc::new(move |command| {
            let mut depth = depth.lock().expect("depth lock");
            match command {
                "quit" if *depth == 0 => {
                    vec!["  Are you sure to logout? (y/n)[n]:".to_string()]
                }
                "quit" => {
                    *depth = depth.saturating_sub(1);
                    vec![prompt_for(*depth)]
                }
                "Y" => vec!["  Bye".to_string()],
                _ => vec![prompt_for(*depth)],
            }
        })
    };
    let (addr, commands) = spawn_stub(LoginScript::Accept, handler).await;
    let mut session = connect(addr).await.expect("login");

    session.logout().await.expect("logout");
    assert!(!session.is_authenticated());
    assert_eq!(session.mode(), &ShellMode::Unauthenticated);
    {
        let log = commands.lock().expect("command log");
        assert!(log.contains(&"Y".to_string()), "confirmation not sent");
    }

    let err = match session.execute("display board 0", Duration::from_millis(20)).await {
        Ok(_) => panic!("commands after logout should fail"),
        Err(err) => err,
    };
    assert!(matches!(err, OltError::NotAuthenticated));
}

#[tokio::test]
async fn manager_reuses_a_healthy_cached_session() {
    let (addr, _) = spawn_stub(LoginScript::Accept, provisioning_handler()).await;
    let manager = OltConnectionManager::new();
    let host = addr.ip().to_string();

    let first = manager
        .get(&host, addr.port(), "admin", "admin", SessionOptions::fast())
        .await
        .expect("first get");
    // The stub accepts a single connection: a second get can only succeed by
    // reusing the cached session.
    let second = manager
        .get(&host, addr.port(), "admin", "admin", SessionOptions::fast())
        .await
        .expect("second get");

    assert!(Arc::ptr_eq(&first, &second));

    let mut session = second.lock().await;
    let report = session.all_boards().await.expect("all boards");
    assert_eq!(report.operation, "all-boards");
}
