use clap::{Args, Parser, Subcommand, ValueEnum};
use folio_core::schema::EntityKind;
use folio_core::types::DbId;

/// Manage drafts, publishing and revisions of Folio content.
#[derive(Debug, Parser)]
#[command(name = "folio", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply pending database migrations.
    Migrate,
    /// Create an entity from a JSON object of live field values.
    Create {
        kind: KindArg,
        #[arg(long, default_value = "{}")]
        fields: String,
    },
    /// Print an entity with its live and draft slots.
    Show {
        #[command(flatten)]
        target: Target,
    },
    /// List fields whose draft differs from the live value.
    Changes {
        #[command(flatten)]
        target: Target,
    },
    /// Save draft field updates, given as a JSON object of path -> value.
    Draft {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        fields: String,
        #[arg(long)]
        locale: Option<String>,
    },
    /// Publish pending drafts.
    Publish {
        #[command(flatten)]
        target: Target,
    },
    /// Discard pending drafts.
    Discard {
        #[command(flatten)]
        target: Target,
    },
    /// Restore live values from a revision.
    Revert {
        #[command(flatten)]
        target: Target,
        revision_id: DbId,
    },
    /// Record a revision of the current live values.
    Annotate {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        action: String,
        #[arg(long)]
        description: Option<String>,
        /// JSON object stored as revision metadata.
        #[arg(long)]
        metadata: Option<String>,
        #[arg(long)]
        published: bool,
    },
    /// List IDs of entities with a pending draft, oldest draft first.
    Pending {
        kind: KindArg,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// List revisions, newest first.
    History {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        offset: Option<i64>,
    },
}

/// The entity a command acts on.
#[derive(Debug, Clone, Copy, Args)]
pub struct Target {
    pub kind: KindArg,
    pub id: DbId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Form,
    Page,
    ContentBlock,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Form => EntityKind::Form,
            KindArg::Page => EntityKind::Page,
            KindArg::ContentBlock => EntityKind::ContentBlock,
        }
    }
}
