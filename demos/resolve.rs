//! Resolve one conflicted document on a live CouchDB
//!
//! Run with: cargo run --example resolve -- <server-url> <database> <doc-id> <strategy>
//!
//! Strategies: `highest:<field>`, `merge`, `nominated:<rev>`

use anyhow::Context;
use couch_deconflict::{ClientConfig, ConflictStrategy, CouchClient, Outcome, Strategy, WriteResult};
use url::Url;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [server, database, doc_id, strategy] = args.as_slice() else {
        anyhow::bail!("usage: resolve <server-url> <database> <doc-id> <strategy>");
    };

    let mut base = Url::parse(server).context("invalid server URL")?;
    let username = (!base.username().is_empty()).then(|| base.username().to_string());
    let password = base.password().map(str::to_string);
    let _ = base.set_username("");
    let _ = base.set_password(None);

    let client = CouchClient::new(ClientConfig {
        base_url: base.to_string(),
        username,
        password,
        ..ClientConfig::for_database(database.as_str())
    })?;
    let strategy: Strategy = strategy.parse()?;

    println!("Resolving {doc_id} in {database} with {strategy}");

    match strategy.resolve(&client, doc_id).await? {
        Outcome::NotConflicted => println!("Document is not conflicted."),
        Outcome::Written(report) => {
            for result in report.results() {
                match result {
                    WriteResult::Ok { id, rev } => println!("  ok     {id} -> {rev}"),
                    WriteResult::Error { id, error, reason } => {
                        println!("  failed {id}: {error} ({reason})")
                    }
                }
            }
            println!("{} of {} mutations applied", report.succeeded(), report.len());
        }
    }

    Ok(())
}
