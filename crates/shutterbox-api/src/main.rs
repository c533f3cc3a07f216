use shutterbox_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    shutterbox_api::telemetry::init_telemetry();

    let config = Config::from_env()?;

    let (state, router) = shutterbox_api::setup::initialize_app(config.clone()).await?;

    let reaper = state.reaper().start();

    shutterbox_api::setup::server::start_server(&config, router).await?;

    reaper.stop().await;

    Ok(())
}
