use diesel::ConnectionError;
use diesel_async::{async_connection_wrapper::AsyncConnectionWrapper, AsyncConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::info;

pub mod error;
pub mod lifecycle;
pub mod models;
pub mod schema;
pub mod store;

pub use diesel_async::AsyncPgConnection;
pub use error::ServiceError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

pub async fn establish_connection(database_url: &str) -> Result<AsyncPgConnection, ConnectionError> {
    AsyncPgConnection::establish(database_url).await
}

/// Applies pending migrations and returns the names of the ones that ran.
pub async fn run_migrations(
    database_url: &str,
) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = establish_connection(database_url).await?;
    let mut async_wrapper: AsyncConnectionWrapper<AsyncPgConnection> =
        AsyncConnectionWrapper::from(conn);
    let applied = tokio::task::spawn_blocking(move || {
        async_wrapper
            .run_pending_migrations(MIGRATIONS)
            .map(|versions| {
                versions
                    .into_iter()
                    .map(|version| version.to_string())
                    .collect::<Vec<_>>()
            })
    })
    .await??;

    info!(count = applied.len(), "applied pending migrations");
    Ok(applied)
}
