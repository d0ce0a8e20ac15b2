use anyhow::{Context, Result, bail};
use olterm::config::SessionOptions;
use olterm::session::{OltConnectionManager, WorkflowOutcome, WorkflowReport};

fn print_report(report: &WorkflowReport) {
    println!("workflow={} outcome={:?}", report.operation, report.outcome);
    for (idx, line) in report.trace.iter().enumerate() {
        println!("  step[{idx}] {line}");
    }
    if !report.output.is_empty() {
        println!("---- output ----");
        println!("{}", report.output);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let [host, username, password, board, port, ont, serial, desc, line_profile, srv_profile] =
        args.as_slice()
    else {
        bail!(
            "usage: provision_ont <host> <username> <password> <board> <port> <ont> <serial> <desc> <line-profile> <srv-profile>"
        );
    };

    let manager = OltConnectionManager::new();
    let entry = manager
        .get(host, 23, username, password, SessionOptions::default())
        .await
        .context("olt login failed")?;

    let mut session = entry.lock().await;
    let report = session
        .register_ont(board, port, ont, serial, desc, line_profile, srv_profile)
        .await?;
    drop(session);

    print_report(&report);
    manager.close_all().await;

    if report.outcome == WorkflowOutcome::Failed {
        bail!("provisioning failed; inspect the step trace above");
    }
    Ok(())
}
