use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;

use lectern_cli::accounts;
use lectern_cli::catalog::{self, SeedOutcome};
use lectern_cli::seeder::{self, DEMO_PASSWORD, SeedConfig};
use lectern_db::{PgStore, init_db_pool, run_migrations};
use lectern_models::{AdminType, UserType};

#[derive(Parser)]
#[command(name = "lectern-cli")]
#[command(about = "Lectern CLI - Administrative tools for Lectern", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a platform administrator account
    CreateAdmin {
        /// Display name
        #[arg(short = 'n', long)]
        name: Option<String>,

        /// Email address
        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,

        /// One of super_admin, admin, editor
        #[arg(short = 't', long, default_value = "super_admin")]
        admin_type: String,
    },
    /// Create a standalone user account with no roles
    CreateUser {
        /// Display name
        #[arg(short = 'n', long)]
        name: Option<String>,

        /// Email address
        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,

        /// One of default, super_admin
        #[arg(short = 't', long, default_value = "default")]
        user_type: String,
    },
    /// Upsert every catalog permission into the permissions table
    SyncPermissions,
    /// Create the default institute and faculty roles when missing
    SeedRoles,
    /// Seed fake institutes, departments and faculty members
    SeedDemo {
        /// Number of institutes to create
        #[arg(short = 'i', long, default_value = "3")]
        institutes: usize,

        /// Number of departments per institute
        #[arg(long, default_value = "4")]
        departments: usize,

        /// Number of faculty members per institute
        #[arg(long, default_value = "10")]
        faculties: usize,
    },
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let cli = Cli::parse();

    let pool = match init_db_pool().await {
        Ok(pool) => pool,
        Err(e) => fail("connecting to database", e),
    };
    if let Err(e) = run_migrations(&pool).await {
        fail("running migrations", e);
    }
    let store = PgStore::new(pool);

    match cli.command {
        Commands::CreateAdmin {
            name,
            email,
            password,
            admin_type,
        } => handle_create_admin(&store, name, email, password, &admin_type).await,
        Commands::CreateUser {
            name,
            email,
            password,
            user_type,
        } => handle_create_user(&store, name, email, password, &user_type).await,
        Commands::SyncPermissions => handle_sync_permissions(&store).await,
        Commands::SeedRoles => handle_seed_roles(&store).await,
        Commands::SeedDemo {
            institutes,
            departments,
            faculties,
        } => handle_seed_demo(&store, institutes, departments, faculties).await,
    }
}

fn fail(action: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("\n❌ Error {}: {}", action, err);
    std::process::exit(1);
}

fn prompt_text(value: Option<String>, prompt: &str) -> String {
    match value {
        Some(value) => value,
        None => Input::new()
            .with_prompt(prompt)
            .interact_text()
            .unwrap_or_else(|e| fail("reading input", e)),
    }
}

fn prompt_password(value: Option<String>) -> String {
    match value {
        Some(value) => value,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()
            .unwrap_or_else(|e| fail("reading password", e)),
    }
}

async fn handle_create_admin(
    store: &PgStore,
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    admin_type: &str,
) {
    let admin_type: AdminType = admin_type
        .parse()
        .unwrap_or_else(|e| fail("parsing admin type", e));
    let name = prompt_text(name, "Name");
    let email = prompt_text(email, "Email address");
    let password = prompt_password(password);

    match accounts::create_admin(store, &name, &email, &password, admin_type).await {
        Ok(admin) => {
            println!("\n✅ Admin created successfully!");
            println!("   Email: {}", admin.email);
            println!("   Name: {}", admin.name);
            println!("   Type: {}", admin.user_type.as_str());
        }
        Err(e) => fail("creating admin", e),
    }
}

async fn handle_create_user(
    store: &PgStore,
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    user_type: &str,
) {
    let user_type: UserType = user_type
        .parse()
        .unwrap_or_else(|e| fail("parsing user type", e));
    let name = prompt_text(name, "Name");
    let email = prompt_text(email, "Email address");
    let password = prompt_password(password);

    match accounts::create_user(store, &name, &email, &password, user_type).await {
        Ok(user) => {
            println!("\n✅ User created successfully!");
            println!("   Email: {}", user.email);
            println!("   Name: {}", user.name);
            println!("   Assign roles with PUT /api/users/{}/roles", user.id);
        }
        Err(e) => fail("creating user", e),
    }
}

async fn handle_sync_permissions(store: &PgStore) {
    match catalog::sync_permissions(store).await {
        Ok(count) => println!("✅ Synced {} permissions", count),
        Err(e) => fail("syncing permissions", e),
    }
}

async fn handle_seed_roles(store: &PgStore) {
    match catalog::seed_default_roles(store).await {
        Ok(outcomes) => {
            for outcome in outcomes {
                match outcome {
                    SeedOutcome::Created(role) => println!("✅ Created role {}", role.role_key),
                    SeedOutcome::AlreadyPresent(role) => {
                        println!("   Role {} already exists, left unchanged", role.role_key)
                    }
                }
            }
        }
        Err(e) => fail("seeding roles", e),
    }
}

async fn handle_seed_demo(
    store: &PgStore,
    institutes: usize,
    departments: usize,
    faculties: usize,
) {
    let config = SeedConfig::new(institutes)
        .with_departments(departments)
        .with_faculties(faculties);

    match seeder::seed_demo(store, store, config).await {
        Ok(summary) => {
            println!(
                "✅ Seeded {} institutes and {} faculty members",
                summary.institutes, summary.faculties
            );
            println!("   Every seeded account logs in with password {}", DEMO_PASSWORD);
        }
        Err(e) => fail("seeding demo data", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
        assert_eq!(Cli::command().get_name(), env!("CARGO_PKG_NAME"));
    }

    #[test]
    fn test_quick_start_commands_parse() {
        let sync = Cli::try_parse_from(["lectern-cli", "sync-permissions"]).unwrap();
        assert!(matches!(sync.command, Commands::SyncPermissions));

        let seed = Cli::try_parse_from(["lectern-cli", "seed-roles"]).unwrap();
        assert!(matches!(seed.command, Commands::SeedRoles));

        let admin = Cli::try_parse_from(["lectern-cli", "create-admin"]).unwrap();
        match admin.command {
            Commands::CreateAdmin { admin_type, .. } => assert_eq!(admin_type, "super_admin"),
            _ => panic!("expected create-admin"),
        }
    }
}
