// src/main.rs

use clap::{Parser, Subcommand};
use dao_governance_client::{
    governance::VoteShares, Config, DaoClient, Principal, Proposal, ProposalFilter, ProposalId,
};
use log::{info, warn};
use serde::Serialize;
use serde_json::json;
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Args {
    /// JSON configuration file. Built-in defaults are used when omitted.
    #[clap(long)]
    config: Option<String>,
    #[clap(long)]
    rpc_url: Option<String>,
    /// Governance contract as `address.name`.
    #[clap(long)]
    contract: Option<String>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List proposals, most recent first.
    Proposals {
        #[clap(long, default_value = "all")]
        filter: ProposalFilter,
    },
    /// DAO-wide statistics.
    Stats,
    /// Check whether a principal has voted on a proposal.
    Receipt {
        #[clap(long)]
        id: ProposalId,
        #[clap(long)]
        voter: String,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProposalView<'a> {
    title: String,
    description: String,
    #[serde(flatten)]
    proposal: &'a Proposal,
    #[serde(skip_serializing_if = "Option::is_none")]
    hours_remaining: Option<u64>,
    vote_shares: VoteShares,
    accepts_votes: bool,
    settled: bool,
}

impl<'a> From<&'a Proposal> for ProposalView<'a> {
    fn from(proposal: &'a Proposal) -> Self {
        Self {
            title: proposal.title(),
            description: proposal.description(),
            proposal,
            hours_remaining: proposal.hours_remaining(),
            vote_shares: proposal.vote_shares(),
            accepts_votes: proposal.accepts_votes(),
            settled: proposal.status.is_terminal(),
        }
    }
}

fn load_config(args: &Args) -> Result<Config, Box<dyn std::error::Error + Send + Sync>> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(url) = &args.rpc_url {
        config.rpc_url = url.clone();
    }
    if let Some(contract) = &args.contract {
        let (address, name) = contract
            .split_once('.')
            .ok_or_else(|| format!("--contract must look like address.name, got '{}'", contract))?;
        config.contract_address = address.to_string();
        config.contract_name = name.to_string();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    LogTracer::init()?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = load_config(&args)?;
    info!("Reading DAO {} via {}", config.contract_id(), config.rpc_url);
    let client = DaoClient::from_config(&config)?;

    let output = match args.command {
        Command::Proposals { filter } => {
            let batch = client.proposals().await?;
            for dropped in &batch.dropped {
                warn!("Proposal #{} could not be loaded: {}", dropped.id, dropped.reason);
            }
            let views: Vec<ProposalView> = filter.apply(&batch.proposals).map(ProposalView::from).collect();
            json!({ "height": batch.height, "proposals": views })
        }
        Command::Stats => {
            let stats = client.stats().await?;
            json!({ "stats": stats, "treasuryTokens": stats.treasury_balance_tokens() })
        }
        Command::Receipt { id, voter } => {
            let voter = Principal::new(voter);
            let receipt = client.vote_receipt(id, &voter).await;
            json!({
                "proposalId": id,
                "voter": voter,
                "hasVoted": receipt.is_some(),
                "choice": receipt.as_ref().and_then(|r| r.choice),
                "weight": receipt.as_ref().and_then(|r| r.weight),
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
