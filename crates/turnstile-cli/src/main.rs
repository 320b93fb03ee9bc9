use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "turnstile", about = "Turnstile gym check-in CLI")]
struct Cli {
    /// Daemon base URL.
    #[arg(long, env = "TURNSTILE_SERVER", default_value = "http://localhost:8080")]
    server: String,

    /// Tenant id for staff operations.
    #[arg(long, env = "TURNSTILE_TENANT")]
    tenant: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue a kiosk QR token for the tenant
    Token,
    /// List members eligible for kiosk check-in
    Members {
        /// Kiosk token (from `turnstile token`)
        token: String,
    },
    /// Check a member in at the desk
    Checkin {
        /// Register number
        reg_no: u32,
    },
    /// Remove today's check-in for a member
    Undo {
        reg_no: u32,
    },
    /// Enroll a face descriptor from a JSON file (array of 128 numbers)
    Enroll {
        reg_no: u32,
        descriptor_file: String,
    },
    /// Enroll a face from an image file (remote-backend tenants)
    EnrollImage {
        reg_no: u32,
        image_file: String,
    },
    /// Remove a member's face enrollment
    RemoveFace {
        reg_no: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let http = reqwest::Client::new();

    let tenant = |c: &Cli| -> Result<String> {
        c.tenant
            .clone()
            .context("staff operations need --tenant or TURNSTILE_TENANT")
    };

    match &cli.command {
        Commands::Token => {
            let body = staff_post(&http, &cli.server, &tenant(&cli)?, "/api/checkin/token", None)
                .await?;
            println!("token: {}", body["token"].as_str().unwrap_or_default());
            println!("url:   {}", body["url"].as_str().unwrap_or_default());
        }
        Commands::Members { token } => {
            let url = format!("{}/api/public/members?token={token}", cli.server);
            let body = check(http.get(&url).send().await?).await?;
            for entry in body.as_array().into_iter().flatten() {
                println!(
                    "{:>5}  {}",
                    entry["regNo"],
                    entry["name"].as_str().unwrap_or_default()
                );
            }
        }
        Commands::Checkin { reg_no } => {
            let body = staff_post(
                &http,
                &cli.server,
                &tenant(&cli)?,
                &format!("/api/checkin/{reg_no}"),
                None,
            )
            .await?;
            println!(
                "checked in: {} at {}",
                body["name"].as_str().unwrap_or_default(),
                body["checkInTime"].as_str().unwrap_or_default()
            );
        }
        Commands::Undo { reg_no } => {
            let tenant = tenant(&cli)?;
            let url = format!("{}/api/checkin/{reg_no}/today", cli.server);
            let body = check(
                http.delete(&url)
                    .header("x-tenant-id", &tenant)
                    .send()
                    .await?,
            )
            .await?;
            if body["removed"].as_bool().unwrap_or(false) {
                println!("today's check-in removed");
            } else {
                println!("nothing to remove today");
            }
        }
        Commands::Enroll {
            reg_no,
            descriptor_file,
        } => {
            let raw = std::fs::read_to_string(descriptor_file)
                .with_context(|| format!("reading {descriptor_file}"))?;
            let descriptor: Value = serde_json::from_str(&raw)?;
            staff_post(
                &http,
                &cli.server,
                &tenant(&cli)?,
                &format!("/api/members/{reg_no}/face"),
                Some(json!({ "descriptor": descriptor })),
            )
            .await?;
            println!("enrolled");
        }
        Commands::EnrollImage { reg_no, image_file } => {
            let bytes =
                std::fs::read(image_file).with_context(|| format!("reading {image_file}"))?;
            let form = reqwest::multipart::Form::new().part(
                "image",
                reqwest::multipart::Part::bytes(bytes).file_name("face.jpg"),
            );
            let url = format!("{}/api/members/{reg_no}/face-image", cli.server);
            check(
                http.post(&url)
                    .header("x-tenant-id", &tenant(&cli)?)
                    .multipart(form)
                    .send()
                    .await?,
            )
            .await?;
            println!("enrolled");
        }
        Commands::RemoveFace { reg_no } => {
            let tenant = tenant(&cli)?;
            let url = format!("{}/api/members/{reg_no}/face", cli.server);
            check(
                http.delete(&url)
                    .header("x-tenant-id", &tenant)
                    .send()
                    .await?,
            )
            .await?;
            println!("face enrollment removed");
        }
    }

    Ok(())
}

async fn staff_post(
    http: &reqwest::Client,
    server: &str,
    tenant: &str,
    path: &str,
    body: Option<Value>,
) -> Result<Value> {
    let mut req = http
        .post(format!("{server}{path}"))
        .header("x-tenant-id", tenant);
    if let Some(body) = body {
        req = req.json(&body);
    }
    check(req.send().await?).await
}

/// Decode a daemon reply, turning error bodies into readable failures.
async fn check(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or_else(|_| json!({}));
    if !status.is_success() {
        let msg = body["error"].as_str().unwrap_or("request failed");
        bail!("{status}: {msg}");
    }
    Ok(body)
}
