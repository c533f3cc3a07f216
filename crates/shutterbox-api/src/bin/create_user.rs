//! Account provisioning CLI. There is no signup endpoint; accounts are
//! created on the server box and the printed API key is handed to the
//! client device.

use anyhow::Context;
use clap::Parser;

use shutterbox_api::auth::generate_api_key;
use shutterbox_api::setup::database::setup_database;
use shutterbox_core::Config;
use shutterbox_db::UserRepository;

#[derive(Parser)]
#[command(name = "create-user", about = "Create an account and print its API key")]
struct Args {
    /// Username for the new account
    username: String,

    /// Use this key instead of generating one (for restoring an account)
    #[arg(long)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    shutterbox_api::telemetry::init_telemetry();

    let args = Args::parse();
    let config = Config::from_env()?;
    config.validate().context("Invalid configuration")?;

    let pool = setup_database(&config).await?;
    let users = UserRepository::new(pool);

    let api_key = args.api_key.unwrap_or_else(generate_api_key);
    let user = users.create(&args.username, &api_key).await?;

    println!("Created user '{}' (id {})", user.username, user.id);
    println!("API key: {api_key}");
    println!("Store this key now; it is not shown again.");

    Ok(())
}
