use std::error::Error;
use std::sync::Arc;

use log::{info, initialize_logger};

use petmatch::config::{Config, Storage, API_PATH};
use petmatch::dashboard::PlaceholderFigures;
use petmatch::db::{LocalRepository, PgRepository};
use petmatch::environment::{Environment, SafeRepository};
use petmatch::routes;
use petmatch::urls::Urls;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let logger = initialize_logger();

    let config = Config::from_env();

    info!(logger, "Starting..."; "port" => config.port, "base_url" => %config.base_url);
    let logger = Arc::new(logger);

    let repository: Arc<SafeRepository> = match &config.storage {
        Storage::Postgres { connection_string } => {
            info!(logger, "Creating database pool...");
            let pool = sqlx::Pool::connect(connection_string)
                .await
                .expect("create database pool from BACKEND_DB_CONNECTION_STRING");
            let repository = PgRepository::new(pool);

            info!(logger, "Ensuring schema...");
            repository.ensure_schema().await?;

            Arc::new(repository)
        }
        Storage::Local { directory } => {
            info!(logger, "Opening local storage..."; "directory" => %directory.display());

            Arc::new(LocalRepository::open(logger.clone(), directory.clone()).await?)
        }
    };

    let urls = Arc::new(Urls::new(&config.base_url, API_PATH));
    let environment = Environment::new(
        logger.clone(),
        repository,
        Arc::new(PlaceholderFigures),
        urls,
    );

    let (address, server) = warp::serve(routes::make_routes(environment))
        .bind_with_graceful_shutdown(([0, 0, 0, 0], config.port), async {
            tokio::signal::ctrl_c().await.ok();
        });

    info!(logger, "Listening..."; "address" => %address);

    server.await;

    info!(logger, "Exiting gracefully...");

    Ok(())
}
