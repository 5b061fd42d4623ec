use anyhow::Context;
use bookstore_app::modules;
use bookstore_kernel::settings::Settings;
use bookstore_kernel::{InitCtx, ModuleRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load settings")?;
    bookstore_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        "bookstore-app bootstrap starting"
    );

    let pool = bookstore_db::connect(&settings.database).await?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &pool)?;

    bookstore_db::apply_migrations(&pool, &registry.collect_migrations())
        .await
        .context("failed to ensure database schema")?;

    let ctx = InitCtx {
        settings: &settings,
        db: &pool,
    };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    tracing::info!("bookstore-app bootstrap complete");

    let served = bookstore_http::start_server(
        &registry,
        &settings,
        bookstore_http::shutdown_signal(),
    )
    .await;

    registry.stop_modules().await?;
    pool.close().await;

    served
}
