use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the ledger node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8080)
    #[arg(long, global = true, env = "LEDGER_NODE", default_value = "http://127.0.0.1:8080")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a transfer
    Submit {
        /// Sender
        #[arg(long)]
        from: String,
        /// Recipient
        #[arg(long)]
        to: String,
        /// Amount
        #[arg(long)]
        amount: u128,
    },
    /// Submit a check request for a candidate hash
    Check {
        #[arg(long)]
        from: String,
        #[arg(long)]
        candidate: String,
    },
    /// Net balance of an address
    Balance { address: String },
    /// Chain length and tip hash
    Head,
    /// Verify hashes and links across the whole chain
    Validate,
    /// Fetch a block by index
    Block { index: u64 },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tx {
    from_address: String,
    to_address: String,
    amount: u128,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Check {
    from_address: String,
    candidate_hash: String,
}

async fn print_response(res: reqwest::Response) -> Result<()> {
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/');
    let client = reqwest::Client::new();

    let res = match cli.cmd {
        Command::Submit { from, to, amount } => {
            let tx = Tx {
                from_address: from,
                to_address: to,
                amount,
            };
            client.post(format!("{node}/tx")).json(&tx).send().await?
        }
        Command::Check { from, candidate } => {
            let check = Check {
                from_address: from,
                candidate_hash: candidate,
            };
            client.post(format!("{node}/check")).json(&check).send().await?
        }
        Command::Balance { address } => client.get(format!("{node}/balance/{address}")).send().await?,
        Command::Head => client.get(format!("{node}/chain/head")).send().await?,
        Command::Validate => client.get(format!("{node}/chain/valid")).send().await?,
        Command::Block { index } => client.get(format!("{node}/blocks/{index}")).send().await?,
    };
    debug!(url = %res.url(), "request complete");
    print_response(res).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_submit() {
        let cli = Cli::try_parse_from([
            "ledger-cli", "submit", "--from", "a", "--to", "b", "--amount", "10",
        ])
        .unwrap();
        assert!(matches!(cli.cmd, Command::Submit { amount: 10, .. }));
    }

    #[test]
    fn transfer_body_uses_wire_names() {
        let tx = Tx {
            from_address: "a".into(),
            to_address: "b".into(),
            amount: 10,
        };
        assert_eq!(
            serde_json::to_string(&tx).unwrap(),
            r#"{"fromAddress":"a","toAddress":"b","amount":10}"#
        );
    }
}
