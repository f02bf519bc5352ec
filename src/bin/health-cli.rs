use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "health-cli")]
#[command(about = "Query the proxy-health control API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:9090")]
    url: String,

    /// Bearer secret, if the API requires one.
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every proxy group
    Groups,
    /// Show one group and its current member
    Group { name: String },
    /// Pick a group's member for a connection (marks the group used)
    Select { name: String },
    /// Probe every member of a group now
    Delay {
        name: String,

        /// Test URL to fetch through each member
        #[arg(long, default_value = "https://www.gstatic.com/generate_204")]
        target: String,

        /// Overall timeout in milliseconds
        #[arg(long, default_value_t = 5000)]
        timeout: u32,

        /// Accepted status codes, e.g. "200/204" or "200-299"
        #[arg(long)]
        status: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", key))?,
        );
    }

    let base = cli.url.trim_end_matches('/');
    let request = match &cli.command {
        Commands::Groups => client.get(format!("{}/groups", base)),
        Commands::Group { name } => client.get(format!("{}/groups/{}", base, name)),
        Commands::Select { name } => client.post(format!("{}/groups/{}/select", base, name)),
        Commands::Delay {
            name,
            target,
            timeout,
            status,
        } => {
            let mut query = vec![
                ("url", target.clone()),
                ("timeout", timeout.to_string()),
            ];
            if let Some(status) = status {
                query.push(("statusCodeRange", status.clone()));
            }
            client
                .get(format!("{}/groups/{}/delay", base, name))
                .query(&query)
        }
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
