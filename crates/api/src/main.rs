use anyhow::Context;

use stockroom_infra::{Bootstrap, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env();
    let bootstrap = Bootstrap::new(settings.clone());

    #[cfg(feature = "redis")]
    let bootstrap = {
        let broker = stockroom_infra::event_bus::RedisBroker::new(&settings.redis_url)
            .with_context(|| format!("invalid REDIS_URL {}", settings.redis_url))?;
        bootstrap.with_broker(broker)
    };

    let app = bootstrap.build().context("failed to bootstrap the allocation service")?;
    if settings.data_path.is_none() {
        tracing::warn!("STOCKROOM_DATA_PATH not set; state is kept in memory");
    }

    #[cfg(feature = "redis")]
    spawn_redis_consumer(app.clone(), &settings)?;

    let router = stockroom_api::app::build_app(app);

    let addr = settings.api_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router).await?;
    Ok(())
}

/// Feed `change_batch_quantity` messages from Redis into the bus.
#[cfg(feature = "redis")]
fn spawn_redis_consumer(app: stockroom_infra::App, settings: &Settings) -> anyhow::Result<()> {
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    use stockroom_infra::consumer;

    let broker = stockroom_infra::event_bus::RedisBroker::new(&settings.redis_url)?;
    std::thread::Builder::new()
        .name("redis-consumer".to_string())
        .spawn(move || {
            let subscription = consumer::subscribe(&broker);
            let shutdown = AtomicBool::new(false);
            let handled = consumer::run(&app, &subscription, &shutdown, Duration::from_secs(1));
            tracing::info!(handled, "redis consumer stopped");
        })?;
    Ok(())
}
