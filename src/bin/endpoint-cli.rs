use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;

use duplex_endpoint::client::{make_request, CallArgs, ReqwestTransport};
use duplex_endpoint::config::{load_config, ClientConfig};
use duplex_endpoint::endpoint::HttpMethod;

#[derive(Parser)]
#[command(name = "endpoint-cli")]
#[command(about = "Call a service endpoint from the command line", long_about = None)]
struct Cli {
    /// Config file providing the `[clients]` app table.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the target app; overrides the config.
    #[arg(short, long)]
    url: Option<String>,

    /// Target app name.
    #[arg(short, long)]
    app: Option<String>,

    /// HTTP verb (get, post, put, patch, delete, head, options, trace).
    method: String,

    /// Resource path within the app.
    entity: Option<String>,

    /// Call arguments as key=value; values that parse as JSON are sent as JSON.
    params: Vec<String>,
}

fn parse_method(name: &str) -> Option<HttpMethod> {
    let method = match name.to_ascii_lowercase().as_str() {
        "get" => HttpMethod::Get,
        "head" => HttpMethod::Head,
        "options" => HttpMethod::Options,
        "patch" => HttpMethod::Patch,
        "post" => HttpMethod::Post,
        "put" => HttpMethod::Put,
        "trace" => HttpMethod::Trace,
        "delete" => HttpMethod::Delete,
        _ => return None,
    };
    Some(method)
}

fn parse_arg(arg: &str) -> Result<(String, Value), String> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{arg}`"))?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let method =
        parse_method(&cli.method).ok_or_else(|| format!("unknown method `{}`", cli.method))?;

    let mut clients = match &cli.config {
        Some(path) => load_config(path)?.clients,
        None => ClientConfig::default(),
    };
    if let Some(url) = cli.url {
        let app = cli.app.clone().unwrap_or_else(|| "cli".to_string());
        clients.apps.insert(app.clone(), url);
        clients.default_app = Some(app);
    }

    let transport = ReqwestTransport::new(&clients)?;

    let mut args = CallArgs::new();
    if let Some(app) = cli.app {
        args = args.app_name(app);
    }
    if let Some(entity) = cli.entity {
        args = args.entity(entity);
    }
    for raw in &cli.params {
        let (key, value) = parse_arg(raw)?;
        args = args.arg(key, value);
    }

    let response = make_request(&transport, method, args).await?;
    let status = response.status();
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
    }

    match response.json::<Value>() {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", response.text()),
    }

    Ok(())
}
