//! Command dispatch. Results are printed to stdout as JSON.

use anyhow::{bail, Context};
use folio_core::draft::pending_changes;
use folio_core::engine::RevisionEngine;
use folio_core::entity::ContentEntity;
use folio_core::schema::EntityKind;
use folio_db::repositories::EntityRepo;
use folio_db::{DbPool, PgStorage};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::cli::{Command, Target};

pub async fn run(
    command: Command,
    pool: DbPool,
    engine: &RevisionEngine<PgStorage>,
) -> anyhow::Result<()> {
    match command {
        Command::Migrate => {
            folio_db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Database migrations applied");
        }
        Command::Create { kind, fields } => {
            let live = parse_object(&fields, "--fields")?;
            let entity = engine.create(kind.into(), &live).await?;
            print_json(&entity)?;
        }
        Command::Show { target } => {
            print_json(&load(engine, target).await?)?;
        }
        Command::Changes { target } => {
            let entity = load(engine, target).await?;
            print_json(&pending_changes(&entity))?;
        }
        Command::Draft {
            target,
            fields,
            locale,
        } => {
            let updates = parse_object(&fields, "--fields")?;
            let entity = load(engine, target).await?;
            let entity = engine
                .save_draft(&entity, &updates, locale.as_deref())
                .await?;
            print_json(&entity)?;
        }
        Command::Publish { target } => {
            let entity = load(engine, target).await?;
            print_json(&engine.publish(&entity).await?)?;
        }
        Command::Discard { target } => {
            let entity = load(engine, target).await?;
            print_json(&engine.discard_draft(&entity).await?)?;
        }
        Command::Revert {
            target,
            revision_id,
        } => {
            let entity = load(engine, target).await?;
            engine.revert_to_revision(&entity, revision_id).await?;
            print_json(&load(engine, target).await?)?;
        }
        Command::Annotate {
            target,
            action,
            description,
            metadata,
            published,
        } => {
            let metadata = metadata
                .as_deref()
                .map(|raw| parse_object(raw, "--metadata"))
                .transpose()?;
            let entity = load(engine, target).await?;
            let revision = engine
                .create_revision(&entity, &action, description.as_deref(), metadata, published)
                .await?;
            print_json(&revision)?;
        }
        Command::Pending { kind, limit } => {
            let mut conn = pool.acquire().await?;
            let ids = EntityRepo::list_with_drafts(&mut conn, kind.into(), limit.max(1)).await?;
            print_json(&ids)?;
        }
        Command::History {
            target,
            limit,
            offset,
        } => {
            let entity = load(engine, target).await?;
            print_json(&engine.history(&entity, limit, offset).await?)?;
        }
    }
    Ok(())
}

async fn load(
    engine: &RevisionEngine<PgStorage>,
    target: Target,
) -> anyhow::Result<ContentEntity> {
    let kind: EntityKind = target.kind.into();
    Ok(engine.find(kind, target.id).await?)
}

/// Parse a command-line argument that must hold a JSON object.
pub fn parse_object(raw: &str, arg: &str) -> anyhow::Result<Map<String, Value>> {
    match serde_json::from_str(raw).with_context(|| format!("{arg} is not valid JSON"))? {
        Value::Object(map) => Ok(map),
        _ => bail!("{arg} must be a JSON object"),
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
