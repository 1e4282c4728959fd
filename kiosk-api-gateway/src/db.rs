//! Schema management for the single database all services share.
//!
//! Every crate embeds its own migrations. They are applied in dependency
//! order and reverted in the opposite order.

use std::collections::HashSet;

use diesel::migration::{Migration, MigrationName, MigrationSource};
use diesel::pg::Pg;
use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_async::{AsyncConnection, AsyncPgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness};
use kiosk_order_service::BoxError;
use tracing::info;

type SyncConnection = AsyncConnectionWrapper<AsyncPgConnection>;

fn migration_sets() -> [(&'static str, EmbeddedMigrations); 3] {
    [
        ("menu", kiosk_menu_service::MIGRATIONS),
        ("auth", kiosk_auth_service::MIGRATIONS),
        ("order", kiosk_order_service::MIGRATIONS),
    ]
}

async fn connect(database_url: &str) -> Result<SyncConnection, BoxError> {
    let conn = AsyncPgConnection::establish(database_url).await?;
    Ok(AsyncConnectionWrapper::from(conn))
}

fn apply_all(conn: &mut SyncConnection) -> Result<(), BoxError> {
    for (name, source) in migration_sets() {
        let applied = conn.run_pending_migrations(source)?;
        info!(set = name, applied = applied.len(), "migrations applied");
    }
    Ok(())
}

/// Reverts the migrations of one set that are currently applied, newest
/// first. Versions recorded by other sets are left alone.
fn revert_set<S: MigrationSource<Pg>>(
    conn: &mut SyncConnection,
    source: S,
) -> Result<usize, BoxError> {
    let applied: HashSet<String> = conn
        .applied_migrations()?
        .into_iter()
        .map(|version| version.to_string())
        .collect();

    let mut migrations = source.migrations()?;
    migrations.sort_by(|a, b| {
        b.name()
            .version()
            .to_string()
            .cmp(&a.name().version().to_string())
    });

    let mut reverted = 0;
    for migration in migrations {
        if applied.contains(&migration.name().version().to_string()) {
            conn.revert_migration(&*migration)?;
            reverted += 1;
        }
    }
    Ok(reverted)
}

fn revert_all(conn: &mut SyncConnection) -> Result<(), BoxError> {
    for (name, source) in migration_sets().into_iter().rev() {
        let reverted = revert_set(conn, source)?;
        info!(set = name, reverted, "migrations reverted");
    }
    Ok(())
}

/// Applies pending migrations. Runs on a blocking thread because the
/// migration harness is synchronous.
pub async fn run_migrations(database_url: &str) -> Result<(), BoxError> {
    let mut conn = connect(database_url).await?;
    tokio::task::spawn_blocking(move || apply_all(&mut conn)).await?
}

/// Drops every table and builds the schema again from scratch.
pub async fn reset_database(database_url: &str) -> Result<(), BoxError> {
    let mut conn = connect(database_url).await?;
    tokio::task::spawn_blocking(move || {
        revert_all(&mut conn)?;
        apply_all(&mut conn)
    })
    .await?
}
