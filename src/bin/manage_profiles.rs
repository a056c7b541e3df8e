//! CLI tool for accounts and the profile approval workflow.
//!
//! Usage:
//!   cargo run --bin manage-profiles -- create-account --email <email> --password <pw> [--role student|admin]
//!   cargo run --bin manage-profiles -- list [--status pending|approved|rejected]
//!   cargo run --bin manage-profiles -- approve --id <identity-id>
//!   cargo run --bin manage-profiles -- reject --id <identity-id>

use std::env;
use std::sync::Arc;

use secrecy::SecretString;

use dept_portal_lib::config::Config;
use dept_portal_lib::db::DbPool;
use dept_portal_lib::identity::AccountDirectory;
use dept_portal_lib::models::{ApprovalStatus, IdentityId, Profile, Role};
use dept_portal_lib::services::create_account;
use dept_portal_lib::store::{DatabaseAccountStore, DatabaseProfileStore, ProfileStore, StoreError};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let command = &args[1];
    if matches!(command.as_str(), "help" | "--help" | "-h") {
        print_usage();
        return;
    }

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match DbPool::new(&config).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error connecting to database: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = pool.run_migrations().await {
        eprintln!("Error running migrations: {}", e);
        std::process::exit(1);
    }
    let accounts = DatabaseAccountStore::new(pool.clone());
    let store = DatabaseProfileStore::new(pool);

    match command.as_str() {
        "create-account" | "add" => {
            let email = require_flag(&args, &["--email", "-e"], "--email");
            let password = SecretString::from(require_flag(&args, &["--password", "-p"], "--password"));
            let role = match parse_flag(&args, &["--role", "-r"]) {
                Some(raw) => Role::parse(&raw).unwrap_or_else(|| {
                    eprintln!("Error: unknown role '{}'", raw);
                    std::process::exit(1);
                }),
                None => Role::Student,
            };
            let directory = AccountDirectory::with_store(Arc::new(accounts));
            add_account(&directory, &store, &email, &password, role).await;
        }
        "list" | "ls" => {
            let status = match parse_flag(&args, &["--status", "-s"]) {
                Some(raw) => ApprovalStatus::parse(&raw).unwrap_or_else(|| {
                    eprintln!("Error: unknown status '{}'", raw);
                    std::process::exit(1);
                }),
                None => ApprovalStatus::Pending,
            };
            list_profiles(&store, status).await;
        }
        "approve" => {
            let id = require_id(&args);
            decide(&store, &id, ApprovalStatus::Approved).await;
        }
        "reject" => {
            let id = require_id(&args);
            decide(&store, &id, ApprovalStatus::Rejected).await;
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            std::process::exit(1);
        }
    }
}

fn parse_flag(args: &[String], names: &[&str]) -> Option<String> {
    args.iter()
        .skip(2)
        .position(|arg| names.contains(&arg.as_str()))
        .and_then(|i| args.get(i + 3).cloned())
}

fn require_flag(args: &[String], names: &[&str], label: &str) -> String {
    match parse_flag(args, names) {
        Some(value) => value,
        None => {
            eprintln!("Error: {} is required", label);
            std::process::exit(1);
        }
    }
}

fn require_id(args: &[String]) -> IdentityId {
    IdentityId::new(require_flag(args, &["--id", "-i"], "--id"))
}

fn truncate(value: Option<&str>, width: usize) -> String {
    let value = value.unwrap_or("-");
    if value.chars().count() > width {
        let cut: String = value.chars().take(width.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        value.to_string()
    }
}

async fn add_account(
    directory: &AccountDirectory,
    store: &DatabaseProfileStore,
    email: &str,
    password: &SecretString,
    role: Role,
) {
    match create_account(directory, store, email, password, role).await {
        Ok(created) => {
            println!();
            println!("Account created.");
            println!("  ID:    {}", created.identity.id);
            println!("  Email: {}", created.identity.email);
            println!("  Role:  {}", created.role);
            match created.profile {
                Some(profile) => println!("  Profile: {} ({})", profile.role, profile.status),
                None if role == Role::Student => {
                    println!("  Profile: completed by the student on first sign-in")
                }
                None => println!("  Profile: provisioned on first sign-in"),
            }
            println!();
        }
        Err(e) => {
            eprintln!("Error creating account: {}", e);
            std::process::exit(1);
        }
    }
}

async fn list_profiles(store: &DatabaseProfileStore, status: ApprovalStatus) {
    let profiles = match store.list_by_status(status).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error listing profiles: {}", e);
            std::process::exit(1);
        }
    };

    if profiles.is_empty() {
        println!("No {} profiles found.", status);
        return;
    }

    println!();
    println!(
        "{:<36} {:<8} {:<10} {:<12} {:<24} {:<6}",
        "ID", "ROLE", "STATUS", "HT NO", "NAME", "YEAR"
    );
    println!("{}", "─".repeat(100));

    for profile in profiles {
        print_row(&profile);
    }
    println!();
}

fn print_row(profile: &Profile) {
    println!(
        "{:<36} {:<8} {:<10} {:<12} {:<24} {:<6}",
        profile.id,
        profile.role,
        profile.status,
        truncate(profile.fields.ht_no.as_deref(), 12),
        truncate(profile.fields.student_name.as_deref(), 24),
        truncate(profile.fields.year.as_deref(), 6),
    );
}

async fn decide(store: &DatabaseProfileStore, id: &IdentityId, status: ApprovalStatus) {
    match store.get(id).await {
        Ok(Some(profile)) if profile.is_admin() => {
            eprintln!("Profile {} belongs to an administrator; nothing to decide.", id);
            std::process::exit(1);
        }
        Ok(Some(profile)) if status == ApprovalStatus::Approved && !profile.is_complete() => {
            eprintln!(
                "Profile {} is missing hall-ticket number, name or year; cannot approve.",
                id
            );
            std::process::exit(1);
        }
        Ok(Some(_)) => {}
        Ok(None) => {
            eprintln!("Profile {} not found.", id);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error loading profile: {}", e);
            std::process::exit(1);
        }
    }

    match store.set_status(id, status).await {
        Ok(profile) => {
            println!("Profile {} is now {}.", id, profile.status);
        }
        Err(StoreError::NotFound(_)) => {
            eprintln!("Profile {} not found.", id);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error updating profile: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!();
    eprintln!("Usage: manage-profiles <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  create-account, add --email <e> --password <p> [--role <r>]");
    eprintln!("                            Create an account (default role: student)");
    eprintln!("  list, ls [--status <s>]   List profiles by status (default: pending)");
    eprintln!("  approve --id <id>         Approve a student profile");
    eprintln!("  reject --id <id>          Reject a student profile");
    eprintln!("  help                      Show this help");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  manage-profiles create-account --email admin@vignanits.ac.in --password s3cret! --role admin");
    eprintln!("  manage-profiles list --status approved");
    eprintln!("  manage-profiles approve --id 01920f6e-7b0c-7c2e-9a51-3f1d2b4c5e6f");
    eprintln!();
}
