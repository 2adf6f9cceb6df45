use std::io::{BufRead, Write};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use x402_client::{
    connect, verify_document_file, ClientError, HttpRequest, PaidClient, X402Config, X402Error,
};

#[derive(Parser)]
#[command(name = "x402-client", version, about = "Paid requests and notary checks for the Swarm provenance gateway")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Request a URL, paying via x402 if the server asks for it
    Fetch {
        url: String,
        /// JSON request body; switches the request to POST
        #[arg(long)]
        data: Option<String>,
        /// Pay up to X402_MAX_AUTO_PAY_USD without asking
        #[arg(long)]
        auto_pay: bool,
        /// Never prompt; fail when a payment would need confirmation
        #[arg(long)]
        no_prompt: bool,
    },
    /// Verify the notary signature of a signed document
    Verify {
        document: std::path::PathBuf,
        /// Expected notary address
        address: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Fetch {
            url,
            data,
            auto_pay,
            no_prompt,
        } => fetch(&url, data, auto_pay, no_prompt).await,
        Command::Verify { document, address } => verify(&document, &address),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn fetch(
    url: &str,
    data: Option<String>,
    auto_pay: bool,
    no_prompt: bool,
) -> Result<ExitCode, ClientError> {
    let mut config = X402Config::from_env()?;
    config.policy.auto_pay |= auto_pay;

    let mut client: PaidClient = connect(&config)?;
    if !no_prompt {
        client = client.with_confirmation(confirm_on_terminal);
    }

    let request = match data {
        Some(body) => {
            let value: serde_json::Value = serde_json::from_str(&body)
                .map_err(X402Error::from)?;
            HttpRequest::post(url).json(&value)?
        }
        None => HttpRequest::get(url),
    };

    let (resp, outcome) = client.execute(request).await?;
    if let Some(outcome) = &outcome {
        tracing::info!(
            transaction = outcome.transaction.as_deref().unwrap_or("pending"),
            "payment settled"
        );
    }

    println!("{}", resp.text());
    Ok(if resp.is_success() {
        ExitCode::SUCCESS
    } else {
        tracing::warn!(status = resp.status, "request did not succeed");
        ExitCode::FAILURE
    })
}

fn verify(document: &std::path::Path, address: &str) -> Result<ExitCode, ClientError> {
    let verdict = verify_document_file(document, address)?;
    match verdict.reason() {
        None => {
            println!("valid: notary signature by {address}");
            Ok(ExitCode::SUCCESS)
        }
        Some(reason) => {
            println!("INVALID: {reason}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn confirm_on_terminal(amount: &str, description: &str) -> bool {
    eprint!("Pay {amount} for {description}? [y/N] ");
    if std::io::stderr().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
