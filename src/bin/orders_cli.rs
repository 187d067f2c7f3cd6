use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use reqwest::{Client, Method, RequestBuilder};
use restaurant_orders::handlers::catalog::ProductsResponse;
use restaurant_orders::models::{Pricing, Product};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::new(&cli.base_url, Duration::from_secs(cli.timeout_secs))?;

    match cli.command {
        Commands::Order(args) => handle_order(&context, args, cli.json).await?,
        Commands::Status(args) => handle_status(&context, args, cli.json).await?,
        Commands::Notify(args) => handle_notify(&context, args, cli.json).await?,
        Commands::CheckPayment(args) => handle_check_payment(&context, args, cli.json).await?,
        Commands::Products => handle_products(&context, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "orders-cli",
    about = "Staff CLI for the restaurant orders API",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "ORDERS_API_URL",
        default_value = "http://localhost:8080",
        help = "Base URL of the orders API"
    )]
    base_url: String,
    #[arg(long, global = true, default_value_t = 10, help = "Request timeout in seconds")]
    timeout_secs: u64,
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show one order
    Order(OrderArgs),
    /// Move an order to a new status and notify the customer
    Status(StatusArgs),
    /// Replay the customer notification for a status set outside the API
    Notify(StatusArgs),
    /// Query a GCash payment source
    CheckPayment(CheckPaymentArgs),
    /// List the menu
    Products,
}

#[derive(Args)]
struct OrderArgs {
    #[arg(help = "Order number, e.g. ORD-1700000000000")]
    order_number: String,
}

#[derive(Args)]
struct StatusArgs {
    #[arg(help = "Order number, e.g. ORD-1700000000000")]
    order_number: String,
    #[arg(help = "Status label, e.g. \"Out for Delivery\"")]
    status: String,
}

#[derive(Args)]
struct CheckPaymentArgs {
    #[arg(help = "Payment source id")]
    source_id: String,
}

struct CliContext {
    client: Client,
    base_url: String,
}

impl CliContext {
    fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/api/v1{}", self.base_url, path);
        debug!(%url, %method, "sending request");
        self.client.request(method, url)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Value> {
        let response = builder.send().await.context("request failed")?;
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if status.is_success() {
            return Ok(body);
        }
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("request failed");
        Err(anyhow!("{} ({})", message, status))
    }
}

async fn handle_order(context: &CliContext, args: OrderArgs, json: bool) -> Result<()> {
    let path = format!("/orders/{}", args.order_number);
    let body = context.send(context.request(Method::GET, &path)).await?;
    if json {
        return print_json(&body);
    }
    let order = body.get("data").unwrap_or(&Value::Null);
    println!(
        "{}  {}  {}  total {}",
        text(order, "orderNumber"),
        text(order, "status"),
        text(order, "fullName"),
        text(order, "total"),
    );
    println!("  {}", text(order, "items"));
    Ok(())
}

async fn handle_status(context: &CliContext, args: StatusArgs, json: bool) -> Result<()> {
    let path = format!("/orders/{}/status", args.order_number);
    let body = context
        .send(
            context
                .request(Method::PUT, &path)
                .json(&json!({ "status": args.status })),
        )
        .await?;
    if json {
        return print_json(&body);
    }
    let change = body.get("data").unwrap_or(&Value::Null);
    if change.get("changed").and_then(Value::as_bool).unwrap_or(false) {
        println!(
            "{}: {} -> {}",
            args.order_number,
            text(change, "previousStatus"),
            args.status
        );
    } else {
        println!("{} already {}", args.order_number, args.status);
    }
    Ok(())
}

async fn handle_notify(context: &CliContext, args: StatusArgs, json: bool) -> Result<()> {
    let path = format!("/orders/{}/status-events", args.order_number);
    let body = context
        .send(
            context
                .request(Method::POST, &path)
                .json(&json!({ "status": args.status })),
        )
        .await?;
    if json {
        return print_json(&body);
    }
    let result = body.get("data").unwrap_or(&body);
    println!("{}: {}", text(result, "result"), text(result, "message"));
    Ok(())
}

async fn handle_products(context: &CliContext, json: bool) -> Result<()> {
    let body = context.send(context.request(Method::GET, "/products")).await?;
    if json {
        return print_json(&body);
    }
    let menu: ProductsResponse =
        serde_json::from_value(body).context("unexpected products payload")?;
    for product in &menu.products {
        println!(
            "{:>4}  {:<28} {:<10} {}",
            product.id,
            product.name,
            product.category,
            price_label(product)
        );
    }
    Ok(())
}

async fn handle_check_payment(context: &CliContext, args: CheckPaymentArgs, json: bool) -> Result<()> {
    let path = format!("/payments/sources/{}", args.source_id);
    let body = context.send(context.request(Method::GET, &path)).await?;
    if json {
        return print_json(&body);
    }
    println!("{}: {} ({})", args.source_id, text(&body, "status"), text(&body, "amount"));
    Ok(())
}

fn price_label(product: &Product) -> String {
    match &product.pricing {
        Pricing::Flat(price) => format!("{:.2}", price),
        Pricing::Sized(sizes) => sizes
            .iter()
            .map(|s| format!("{} {:.2}", s.name, s.price))
            .collect::<Vec<_>>()
            .join(" / "),
    }
}

fn text(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
