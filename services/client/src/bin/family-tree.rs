//! services/client/src/bin/family-tree.rs
//!
//! Command-line front end: each subcommand drives the same page models and stores a
//! graphical shell would.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use client_lib::{
    config::Config,
    error::ClientError,
    stores::{CredentialError, SyncOutcome},
    ui::{
        resolve, AppState, IndividualsPage, LoginMode, LoginPage, MemberForm, Navigator, Route,
    },
};
use family_tree_core::domain::{Individual, IndividualId, Sex};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "family-tree", version, about = "Manage your family members")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in and remember the session
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Create an account (log in afterwards)
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Issue a new API key
    RotateKey,
    /// List family members
    List {
        /// Only show members whose names contain this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Add a family member
    Add {
        #[command(flatten)]
        fields: MemberFields,
    },
    /// Change a family member
    Update {
        id: String,
        #[command(flatten)]
        fields: MemberFields,
    },
    /// Delete a family member
    Delete { id: String },
}

#[derive(clap::Args, Debug, Default)]
struct MemberFields {
    #[arg(long)]
    gedcom_id: Option<String>,
    #[arg(long)]
    given_names: Option<String>,
    #[arg(long)]
    surname: Option<String>,
    /// M, F or U
    #[arg(long, value_parser = parse_sex)]
    sex: Option<Sex>,
    /// YYYY-MM-DD
    #[arg(long)]
    birth_date: Option<NaiveDate>,
    #[arg(long)]
    birth_place: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    death_date: Option<NaiveDate>,
    #[arg(long)]
    death_place: Option<String>,
    #[arg(long)]
    note: Option<String>,
}

impl MemberFields {
    /// Overwrites the form fields that were given on the command line.
    fn apply_to(self, form: &mut MemberForm) {
        if let Some(value) = self.gedcom_id {
            form.gedcom_id = value;
        }
        if let Some(value) = self.given_names {
            form.given_names = value;
        }
        if let Some(value) = self.surname {
            form.surname = value;
        }
        if self.sex.is_some() {
            form.sex = self.sex;
        }
        if self.birth_date.is_some() {
            form.birth_date = self.birth_date;
        }
        if let Some(value) = self.birth_place {
            form.birth_place = value;
        }
        if self.death_date.is_some() {
            form.death_date = self.death_date;
        }
        if let Some(value) = self.death_place {
            form.death_place = value;
        }
        if let Some(value) = self.note {
            form.note = value;
        }
    }
}

fn parse_sex(raw: &str) -> Result<Sex, String> {
    Sex::from_code(raw).ok_or_else(|| format!("'{}' is not one of M, F, U", raw))
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let cli = Cli::parse();
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded.");

    // --- 2. Build the Shared AppState ---
    let app = AppState::from_config(config)?;

    // --- 3. Run the Command ---
    let result = run(&app, cli.command).await;
    app.shutdown();
    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(app: &AppState, command: Commands) -> Result<(), ClientError> {
    match command {
        Commands::Login { username, password } => {
            let mut page = LoginPage::new();
            page.username = username;
            page.password = password;
            submit_login(app, page).await
        }
        Commands::Register {
            username,
            email,
            password,
        } => {
            let mut page = LoginPage::new();
            page.mode = LoginMode::Register;
            page.username = username;
            page.email = email;
            page.password = password;
            submit_login(app, page).await
        }
        Commands::Logout => {
            let mut navigator = Navigator::new(Route::Home, &app.credentials.snapshot());
            let route = navigator.logout(&app.credentials);
            info!("Navigating to {}", route);
            println!("Logged out.");
            Ok(())
        }
        Commands::Whoami => {
            require_session(app)?;
            let user = app.credentials.refresh_profile().await?;
            println!("{} <{}>", user.username, user.email);
            Ok(())
        }
        Commands::RotateKey => {
            require_session(app)?;
            let api_key = app.credentials.regenerate_api_key().await?;
            println!("New API key: {}", api_key);
            Ok(())
        }
        Commands::List { search } => {
            let mut page = open_individuals(app).await?;
            page.search_term = search.unwrap_or_default();
            let visible = page.visible();
            if visible.is_empty() {
                println!("No family members found");
            }
            for individual in &visible {
                print_card(individual);
            }
            Ok(())
        }
        Commands::Add { fields } => {
            let mut page = IndividualsPage::new(app.clone());
            require_session(app)?;
            page.toggle_add_form();
            if let Some(form) = page.form_mut() {
                fields.apply_to(form);
            }
            let created = submit_member(&mut page).await?;
            println!("Added {} ({})", created.display_name(), created.id);
            Ok(())
        }
        Commands::Update { id, fields } => {
            let mut page = open_individuals(app).await?;
            let id = IndividualId::new(id);
            let existing = app
                .records
                .snapshot()
                .find(&id)
                .cloned()
                .ok_or_else(|| ClientError::Failed(format!("No family member with id {}", id)))?;
            page.edit(&existing);
            if let Some(form) = page.form_mut() {
                fields.apply_to(form);
            }
            let updated = submit_member(&mut page).await?;
            println!("Updated {} ({})", updated.display_name(), updated.id);
            Ok(())
        }
        Commands::Delete { id } => {
            let page = IndividualsPage::new(app.clone());
            require_session(app)?;
            let id = IndividualId::new(id);
            match page.delete(&id).await {
                Some(SyncOutcome::Applied(())) => {
                    println!("Deleted {}", id);
                    Ok(())
                }
                _ => Err(banner(&page)),
            }
        }
    }
}

/// Applies the navigation guard: every command but login/register/logout needs a session.
fn require_session(app: &AppState) -> Result<(), ClientError> {
    match resolve(Route::Individuals, &app.credentials.snapshot()) {
        Route::Login => Err(CredentialError::NotAuthenticated.into()),
        _ => Ok(()),
    }
}

async fn submit_login(app: &AppState, mut page: LoginPage) -> Result<(), ClientError> {
    match page.submit(&app.credentials).await {
        Some(route) => {
            info!("Navigating to {}", route);
            println!("Logged in.");
            Ok(())
        }
        None => match page.error() {
            Some(message) => Err(ClientError::Failed(message.to_string())),
            None => {
                println!("{}", page.notice().unwrap_or("Done."));
                Ok(())
            }
        },
    }
}

async fn open_individuals(app: &AppState) -> Result<IndividualsPage, ClientError> {
    require_session(app)?;
    let page = IndividualsPage::new(app.clone());
    match page.load().await {
        Some(SyncOutcome::Applied(_)) => Ok(page),
        _ => Err(banner(&page)),
    }
}

async fn submit_member(page: &mut IndividualsPage) -> Result<Individual, ClientError> {
    match page.submit_form().await {
        Some(SyncOutcome::Applied(individual)) => Ok(individual),
        Some(_) => Err(banner(page)),
        None => Err(ClientError::Failed(
            page.form_error().unwrap_or("Nothing to submit").to_string(),
        )),
    }
}

fn banner(page: &IndividualsPage) -> ClientError {
    ClientError::Failed(page.error().unwrap_or_else(|| "Unknown error".to_string()))
}

fn print_card(individual: &Individual) {
    println!("{}  {}", individual.id, individual.display_name());
    if let Some(birth) = individual.birth_date {
        match &individual.birth_place {
            Some(place) => println!("    b. {} - {}", birth, place),
            None => println!("    b. {}", birth),
        }
    }
    if let Some(death) = individual.death_date {
        match &individual.death_place {
            Some(place) => println!("    d. {} - {}", death, place),
            None => println!("    d. {}", death),
        }
    }
    if let Some(note) = &individual.note {
        println!("    {}", note);
    }
}
