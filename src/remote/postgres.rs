// ABOUTME: PostgreSQL role and database helpers run through psql as the postgres user.
// ABOUTME: Each helper checks the catalog first so repeated runs leave existing objects alone.

use super::{RemoteCommand, RemoteEnvironment, RemoteError};

/// System account that owns the cluster.
pub const POSTGRES_USER: &str = "postgres";

/// Desired login role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSpec {
    pub name: String,
    pub password: String,
    pub createdb: bool,
}

impl RoleSpec {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            createdb: false,
        }
    }

    pub fn createdb(mut self, yes: bool) -> Self {
        self.createdb = yes;
        self
    }

    fn create_statement(&self) -> String {
        let mut sql = format!(
            "CREATE ROLE {} WITH LOGIN PASSWORD {}",
            identifier(&self.name),
            literal(&self.password)
        );
        if self.createdb {
            sql.push_str(" CREATEDB");
        }
        sql
    }
}

/// Desired database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSpec {
    pub name: String,
    pub owner: String,
    pub encoding: String,
    pub template: String,
    pub locale: String,
}

impl DatabaseSpec {
    /// A UTF-8 database cloned from template0 with the en_US.UTF-8 locale.
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            encoding: "utf8".to_string(),
            template: "template0".to_string(),
            locale: "en_US.UTF-8".to_string(),
        }
    }

    fn createdb(&self) -> RemoteCommand {
        RemoteCommand::new("createdb")
            .args(["-E", self.encoding.as_str(), "-T", self.template.as_str()])
            .arg(format!("--lc-collate={}", self.locale))
            .arg(format!("--lc-ctype={}", self.locale))
            .args(["-O", self.owner.as_str(), self.name.as_str()])
            .as_user(POSTGRES_USER)
    }
}

/// Run one SQL statement with psql in unaligned tuples-only mode.
pub fn psql(database: Option<&str>, sql: &str) -> RemoteCommand {
    let cmd = RemoteCommand::new("psql").args(["-t", "-A"]);
    let cmd = match database {
        Some(db) => cmd.args(["-d", db]),
        None => cmd,
    };
    cmd.args(["-c", sql]).as_user(POSTGRES_USER)
}

/// SQL string literal.
pub fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// SQL quoted identifier.
pub fn identifier(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

async fn catalog_has<E>(env: &E, sql: &str) -> Result<bool, RemoteError>
where
    E: RemoteEnvironment + ?Sized,
{
    let output = env.run(&psql(None, sql)).await?;
    Ok(output.stdout.trim() == "1")
}

pub async fn ensure_role<E>(env: &E, role: &RoleSpec) -> Result<(), RemoteError>
where
    E: RemoteEnvironment + ?Sized,
{
    let lookup = format!("SELECT 1 FROM pg_roles WHERE rolname = {}", literal(&role.name));
    if catalog_has(env, &lookup).await? {
        tracing::debug!(role = %role.name, "database role already exists");
        return Ok(());
    }

    tracing::info!(role = %role.name, "creating database role");
    env.run(&psql(None, &role.create_statement())).await?;
    Ok(())
}

pub async fn ensure_database<E>(env: &E, database: &DatabaseSpec) -> Result<(), RemoteError>
where
    E: RemoteEnvironment + ?Sized,
{
    let lookup = format!(
        "SELECT 1 FROM pg_database WHERE datname = {}",
        literal(&database.name)
    );
    if catalog_has(env, &lookup).await? {
        tracing::debug!(database = %database.name, "database already exists");
        return Ok(());
    }

    tracing::info!(database = %database.name, owner = %database.owner, "creating database");
    env.run(&database.createdb()).await?;
    Ok(())
}
