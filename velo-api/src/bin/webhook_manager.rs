// Strava push-subscription management.
//
// Run inside the api container:
//   webhook-manager create https://velo.example.com/webhook
//   webhook-manager list
//   webhook-manager delete 120475

use clap::{Parser, Subcommand};

use velo_api::config::AppConfig;
use velo_shared::clients::strava::StravaClient;

#[derive(Parser)]
#[command(
    name = "webhook-manager",
    about = "Manage Strava webhook subscriptions for Velo",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new webhook subscription
    Create {
        /// Public callback URL, e.g. https://velo.example.com/webhook
        callback_url: String,
    },
    /// List active webhook subscriptions
    List,
    /// Delete a webhook subscription
    Delete {
        subscription_id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    velo_shared::middleware::init_tracing("webhook-manager");

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    let strava = StravaClient::new(&config.strava_client_id, &config.strava_client_secret);

    match cli.command {
        Commands::Create { callback_url } => {
            println!("Registering webhook with Strava...");
            println!("Callback URL: {callback_url}");

            let subscription = strava
                .create_subscription(&callback_url, &config.webhook_verify_token)
                .await?;

            println!("Subscription created with id {}", subscription.id);
        }
        Commands::List => {
            let subscriptions = strava.list_subscriptions().await?;

            if subscriptions.is_empty() {
                println!("No active webhook subscriptions found.");
                return Ok(());
            }

            println!("Found {} webhook subscription(s):", subscriptions.len());
            for sub in subscriptions {
                println!("ID: {}", sub.id);
                if let Some(app_id) = sub.application_id {
                    println!("Application ID: {app_id}");
                }
                println!("Callback URL: {}", sub.callback_url);
                if let Some(created_at) = sub.created_at {
                    println!("Created At: {created_at}");
                }
                println!("{}", "-".repeat(40));
            }
        }
        Commands::Delete { subscription_id } => {
            strava.delete_subscription(subscription_id).await?;
            println!("Successfully deleted subscription {subscription_id}");
        }
    }

    Ok(())
}
