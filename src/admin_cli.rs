// src/admin_cli.rs
use crate::auth::AuthConfig;
use crate::core::{ConfigManager, Database};
use crate::models::{MemberRole, NewPersona, PersonaDefinition};
use crate::repositories::{OrganizationRepository, PersonaRepository, UserRepository};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "leadscope-admin")]
#[command(about = "Manage organizations, users and personas for Leadscope")]
pub struct AdminCli {
    #[command(subcommand)]
    pub command: AdminCommand,

    /// Overrides the configured database path
    #[arg(long, env = "DATABASE_PATH")]
    pub database_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum AdminCommand {
    /// Create the database and run migrations
    Init,
    /// Create an organization
    AddOrg {
        name: String,
        /// What the organization sells
        #[arg(long)]
        product: Option<String>,
    },
    /// Create a user and make them a member of an organization
    AddUser {
        email: String,
        org_id: Uuid,
        #[arg(long, default_value = "member")]
        role: MemberRole,
        #[arg(long)]
        name: Option<String>,
    },
    /// List all organizations
    ListOrgs,
    /// Create a target persona for an organization
    AddPersona {
        org_id: Uuid,
        name: String,
        #[arg(long, value_delimiter = ',')]
        industries: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        job_titles: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        seniority: Vec<String>,
    },
    /// Print a bearer token for an existing user
    Token {
        email: String,
        #[arg(long)]
        hours: Option<i64>,
    },
    /// Import users from a CSV file with rows email,org_id[,role,full_name]
    ImportUsers { csv_file: PathBuf },
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub failed: usize,
}

pub async fn handle_admin_command(cli: AdminCli, config: ConfigManager) -> Result<()> {
    let database_path = cli
        .database_path
        .unwrap_or_else(|| config.environment.database_path.clone());
    let database = Database::connect(&database_path).await?;
    let pool = database.pool();

    match cli.command {
        AdminCommand::Init => {
            info!("Database initialized at {}", database_path.display());
        }

        AdminCommand::AddOrg { name, product } => {
            let org = OrganizationRepository::new(pool)
                .create(&name, product.as_deref())
                .await?;
            info!("Organization created: {} ({})", org.name, org.id);
            println!("{}", org.id);
        }

        AdminCommand::AddUser {
            email,
            org_id,
            role,
            name,
        } => {
            let user_id = add_user(&database, &email, org_id, role, name.as_deref()).await?;
            info!("User {} added to {} as {}", email, org_id, role);
            println!("{}", user_id);
        }

        AdminCommand::ListOrgs => {
            let orgs = OrganizationRepository::new(pool).list().await?;
            if orgs.is_empty() {
                info!("No organizations found");
            }
            println!("{:<38} {:<30} {:<20}", "ID", "Name", "Created");
            println!("{}", "-".repeat(88));
            for org in orgs {
                println!(
                    "{:<38} {:<30} {:<20}",
                    org.id,
                    org.name,
                    org.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }

        AdminCommand::AddPersona {
            org_id,
            name,
            industries,
            job_titles,
            seniority,
        } => {
            if OrganizationRepository::new(pool).find_by_id(org_id).await?.is_none() {
                anyhow::bail!("Organization {} not found", org_id);
            }
            let persona = PersonaRepository::new(pool)
                .create(
                    org_id,
                    &NewPersona {
                        name,
                        definition: PersonaDefinition {
                            industries,
                            job_titles,
                            seniority,
                        },
                    },
                )
                .await?;
            info!("Persona created: {} ({})", persona.name, persona.id);
            println!("{}", persona.id);
        }

        AdminCommand::Token { email, hours } => {
            let user = UserRepository::new(pool)
                .find_by_email(&email)
                .await?
                .ok_or_else(|| anyhow::anyhow!("No user with email {}", email))?;
            let token = AuthConfig::new(&config.auth).issue_token(&user, hours)?;
            println!("{}", token);
        }

        AdminCommand::ImportUsers { csv_file } => {
            let file = std::fs::File::open(&csv_file)
                .with_context(|| format!("CSV file not found: {}", csv_file.display()))?;
            let summary = import_users(&database, file).await?;
            info!(
                "Import completed: {} imported, {} failed",
                summary.imported, summary.failed
            );
        }
    }

    Ok(())
}

/// Create the user if needed, add the membership and point the user's current org at it
pub async fn add_user(
    database: &Database,
    email: &str,
    org_id: Uuid,
    role: MemberRole,
    full_name: Option<&str>,
) -> Result<Uuid> {
    let pool = database.pool();
    if OrganizationRepository::new(pool).find_by_id(org_id).await?.is_none() {
        anyhow::bail!("Organization {} not found", org_id);
    }

    let users = UserRepository::new(pool);
    let user = match users.find_by_email(email).await? {
        Some(user) => {
            users.set_current_org(user.id, org_id).await?;
            user
        }
        None => users.create(email, full_name, Some(org_id)).await?,
    };
    users.add_member(org_id, user.id, role).await?;

    Ok(user.id)
}

/// Import users row by row. Bad rows are logged and counted, never fatal.
pub async fn import_users<R: Read>(database: &Database, source: R) -> Result<ImportSummary> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);
    let mut summary = ImportSummary::default();

    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!("CSV parsing error: {}", e);
                summary.failed += 1;
                continue;
            }
        };

        let email = record.get(0).unwrap_or_default();
        let org_id = record.get(1).unwrap_or_default();
        if email.is_empty() || org_id.is_empty() {
            warn!("Skipping record without email or org_id");
            summary.failed += 1;
            continue;
        }

        let org_id = match Uuid::parse_str(org_id) {
            Ok(id) => id,
            Err(_) => {
                warn!("Skipping {}: '{}' is not an organization id", email, org_id);
                summary.failed += 1;
                continue;
            }
        };
        let role = match record.get(2).filter(|r| !r.is_empty()) {
            Some(raw) => match raw.parse::<MemberRole>() {
                Ok(role) => role,
                Err(e) => {
                    warn!("Skipping {}: {}", email, e);
                    summary.failed += 1;
                    continue;
                }
            },
            None => MemberRole::Member,
        };
        let full_name = record.get(3).filter(|n| !n.is_empty());

        match add_user(database, email, org_id, role, full_name).await {
            Ok(_) => {
                info!("Added {} -> {}", email, org_id);
                summary.imported += 1;
            }
            Err(e) => {
                error!("Failed to add {}: {}", email, e);
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_user_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        let org = OrganizationRepository::new(db.pool())
            .create("Acme", None)
            .await
            .unwrap();

        let first = add_user(&db, "Ann@Acme.io", org.id, MemberRole::Member, Some("Ann"))
            .await
            .unwrap();
        let second = add_user(&db, "ann@acme.io", org.id, MemberRole::Admin, None)
            .await
            .unwrap();
        assert_eq!(first, second);

        let users = UserRepository::new(db.pool());
        let role = users.membership_role(first, org.id).await.unwrap();
        assert_eq!(role, Some(MemberRole::Admin));
        let user = users.find_by_id(first).await.unwrap().unwrap();
        assert_eq!(user.current_org_id, Some(org.id));
    }

    #[tokio::test]
    async fn test_add_user_unknown_org() {
        let db = Database::in_memory().await.unwrap();
        let result = add_user(&db, "a@b.io", Uuid::new_v4(), MemberRole::Member, None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_import_users_counts_bad_rows() {
        let db = Database::in_memory().await.unwrap();
        let org = OrganizationRepository::new(db.pool())
            .create("Acme", None)
            .await
            .unwrap();

        let csv = format!(
            "email,org_id,role,full_name\n\
             ann@acme.io,{org},owner,Ann Lee\n\
             bob@acme.io,{org}\n\
             carl@acme.io,not-a-uuid\n\
             dora@acme.io,{org},guest\n\
             ,{org}\n",
            org = org.id
        );

        let summary = import_users(&db, csv.as_bytes()).await.unwrap();
        assert_eq!(summary, ImportSummary { imported: 2, failed: 3 });

        let users = UserRepository::new(db.pool());
        let ann = users.find_by_email("ann@acme.io").await.unwrap().unwrap();
        assert_eq!(ann.full_name.as_deref(), Some("Ann Lee"));
        assert_eq!(
            users.membership_role(ann.id, org.id).await.unwrap(),
            Some(MemberRole::Owner)
        );
    }
}
