use anyhow::{Context, Result, bail};
use olterm::config::SessionOptions;
use olterm::session::OltConnectionManager;

#[tokio::main]
async fn main() -> Result<()> {
    let json = std::env::args().any(|arg| arg == "--json");
    let args: Vec<String> = std::env::args()
        .skip(1)
        .filter(|arg| arg != "--json")
        .collect();
    let [host, username, password, board] = args.as_slice() else {
        bail!("usage: board_report [--json] <host> <username> <password> <board>");
    };

    let manager = OltConnectionManager::new();
    let entry = manager
        .get(host, 23, username, password, SessionOptions::default())
        .await
        .context("olt login failed")?;

    let mut session = entry.lock().await;
    let inventory = session.all_boards().await?;
    let status = session.board_status(board).await?;
    let autofind = session.ont_autofind().await?;
    drop(session);

    for report in [&inventory, &status, &autofind] {
        if json {
            println!("{}", report.to_json()?);
            continue;
        }
        println!("== {} ({:?}) ==", report.operation, report.outcome);
        println!("{}", report.output);
        println!();
    }

    manager.close_all().await;
    Ok(())
}
