//! quarry CLI - inspect schemas, bootstrap databases and run entity queries
//!
//! Usage:
//!   quarry ddl [schema.toml] [--dialect <dialect>]
//!   quarry describe [schema.toml]
//!   quarry init [schema.toml] [--database <file>]
//!   quarry fetch <entity> [--schema <schema.toml>] [--fetch <relationship>] [--limit <n>]
//!
//! Examples:
//!   quarry ddl demos/team_member.toml --dialect postgres
//!   quarry init demos/team_member.toml --database app.db
//!   quarry fetch Member --schema demos/team_member.toml --database app.db --fetch team

use clap::{Parser, Subcommand, ValueEnum};
use quarry::config::Settings;
use quarry::exec::{Entity, SqliteBackend};
use quarry::query::select_from;
use quarry::schema::{Cardinality, Schema, SchemaBuilder};
use quarry::sql::{ddl, Dialect, ExprExt};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "quarry - typed entity queries compiled to SQL")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to QUARRY_CONFIG, ./quarry.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print CREATE TABLE statements for a schema
    Ddl {
        /// Path to the schema file
        schema: Option<PathBuf>,

        /// SQL dialect to generate (defaults to query.dialect from settings)
        #[arg(short, long)]
        dialect: Option<DialectArg>,
    },

    /// List entities, attributes and relationships of a schema
    Describe {
        /// Path to the schema file
        schema: Option<PathBuf>,
    },

    /// Create the tables of a schema in a SQLite database
    Init {
        /// Path to the schema file
        schema: Option<PathBuf>,

        /// SQLite database file (defaults to database.path from settings)
        #[arg(long)]
        database: Option<String>,
    },

    /// Fetch entities as JSON
    Fetch {
        /// Entity name
        entity: String,

        /// Path to the schema file
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// SQLite database file (defaults to database.path from settings)
        #[arg(long)]
        database: Option<String>,

        /// Relationship to load in the same query
        #[arg(short, long)]
        fetch: Option<String>,

        /// Maximum number of entities
        #[arg(short, long)]
        limit: Option<u64>,

        /// Print the compiled SQL instead of running it
        #[arg(long)]
        sql: bool,

        /// Print the number of matching entities instead of the entities
        #[arg(long, conflicts_with = "sql")]
        count: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Sqlite,
    Postgres,
    Duckdb,
    Mysql,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Sqlite => Dialect::Sqlite,
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Duckdb => Dialect::DuckDb,
            DialectArg::Mysql => Dialect::MySql,
        }
    }
}

type CliResult = Result<(), Box<dyn Error>>;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let mut settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Ddl { schema, dialect } => cmd_ddl(&settings, schema, dialect),
        Commands::Describe { schema } => cmd_describe(&settings, schema),
        Commands::Init { schema, database } => {
            if let Some(path) = database {
                settings.database.path = path;
            }
            cmd_init(&settings, schema)
        }
        Commands::Fetch {
            entity,
            schema,
            database,
            fetch,
            limit,
            sql,
            count,
        } => {
            if let Some(path) = database {
                settings.database.path = path;
            }
            cmd_fetch(
                &settings,
                schema,
                &entity,
                FetchOptions {
                    fetch,
                    limit,
                    sql,
                    count,
                },
            )
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_schema(settings: &Settings, file: Option<PathBuf>) -> Result<Arc<Schema>, Box<dyn Error>> {
    let path = match file {
        Some(path) => path,
        None => settings
            .schema_path()?
            .ok_or("no schema file given and none configured in settings")?,
    };
    Ok(SchemaBuilder::from_file(&path)?.build()?)
}

fn cmd_ddl(settings: &Settings, schema: Option<PathBuf>, dialect: Option<DialectArg>) -> CliResult {
    let schema = load_schema(settings, schema)?;
    let dialect = match dialect {
        Some(arg) => arg.into(),
        None => settings.dialect()?,
    };
    for statement in ddl::create_statements(&schema, dialect) {
        println!("{};", statement.sql());
        println!();
    }
    Ok(())
}

fn cmd_describe(settings: &Settings, schema: Option<PathBuf>) -> CliResult {
    let schema = load_schema(settings, schema)?;
    for entity in schema.entities() {
        println!(
            "{} (table: \"{}\", alias: {})",
            entity.name(),
            entity.table_name(),
            entity.default_alias()
        );
        for attr in entity.attributes() {
            let mut flags = Vec::new();
            if attr.is_primary_key() {
                flags.push("primary key");
            }
            if !attr.is_nullable() {
                flags.push("not null");
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };
            println!("  - {}: {}{}", attr.name(), attr.value_type(), flags);
        }
        for rel in entity.relationships() {
            let kind = match rel.cardinality() {
                Cardinality::ManyToOne => "many-to-one",
                Cardinality::OneToMany => "one-to-many",
            };
            println!(
                "  > {} -> {} ({} via {})",
                rel.name(),
                rel.target(),
                kind,
                rel.foreign_key()
            );
        }
        println!();
    }
    Ok(())
}

fn cmd_init(settings: &Settings, schema: Option<PathBuf>) -> CliResult {
    let schema = load_schema(settings, schema)?;
    let backend = SqliteBackend::from_settings(settings)?;
    backend.create_schema(&schema)?;
    println!(
        "Created {} table(s) in {}",
        schema.entities().count(),
        settings.database.resolved_path()?
    );
    Ok(())
}

struct FetchOptions {
    fetch: Option<String>,
    limit: Option<u64>,
    sql: bool,
    count: bool,
}

fn cmd_fetch(
    settings: &Settings,
    schema: Option<PathBuf>,
    entity: &str,
    options: FetchOptions,
) -> CliResult {
    let schema = load_schema(settings, schema)?;
    let path = schema.entity(entity)?;

    let mut query = select_from(&path);
    if let Some(name) = &options.fetch {
        let relationship = path.relationship(name)?;
        let target = schema.entity(relationship.target_entity())?;
        query = query.left_join(relationship, &target)?.fetch_join()?;
    }
    query = query.order_by([path.primary_key().asc()]);
    if let Some(limit) = options.limit {
        query = query.limit(limit);
    }

    if options.sql {
        println!("{}", query.to_statement(settings.dialect()?)?);
        return Ok(());
    }

    let backend = SqliteBackend::from_settings(settings)?;
    if options.count {
        println!("{}", query.fetch_count(&backend)?);
        return Ok(());
    }

    let entities: Vec<Entity> = query.fetch(&backend)?;
    let json: Vec<serde_json::Value> = entities.iter().map(Entity::to_json).collect();
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
