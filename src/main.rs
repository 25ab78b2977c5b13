mod shell;

use std::error::Error;

use clap::{Parser, Subcommand};
use eventhub::auth;
use eventhub::config::Config;
use eventhub::store::{self, AppState, Db, seed};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eventhub", about = "Event registration app and its mock collection store")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the JSON collection store
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        data_file: Option<String>,
    },
    /// Drive the application interactively against a running store
    Shell {
        /// Initial location
        #[arg(default_value = "/")]
        path: String,
    },
    /// Add an admin account to the data file
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "Admin")]
        first_name: String,
        #[arg(long, default_value = "User")]
        last_name: String,
        #[arg(long)]
        data_file: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    dotenvy::dotenv().ok();
    let mut config = Config::from_env();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            host,
            port,
            data_file,
        } => {
            config.host = host.unwrap_or(config.host);
            config.port = port.unwrap_or(config.port);
            config.data_file = data_file.unwrap_or(config.data_file);

            let db = Db::open(&config.data_file).await?;
            let addr = format!("{}:{}", config.host, config.port);
            tracing::info!(data_file = %config.data_file, "binding {}", addr);

            let listener = tokio::net::TcpListener::bind(&addr).await?;
            store::serve(listener, AppState::new(db)).await?;
        }
        Command::Shell { path } => shell::run(&config, &path).await?,
        Command::CreateAdmin {
            username,
            email,
            first_name,
            last_name,
            data_file,
        } => {
            let data_file = data_file.unwrap_or(config.data_file);
            create_admin(&data_file, &username, &email, &first_name, &last_name).await?;
        }
    }

    Ok(())
}

async fn create_admin(
    data_file: &str,
    username: &str,
    email: &str,
    first_name: &str,
    last_name: &str,
) -> Result<(), Box<dyn Error>> {
    if !auth::is_valid_email(email) {
        return Err(format!("invalid email address: {email}").into());
    }

    let db = Db::open(data_file).await?;
    seed::ensure_user_available(&db, username, email).await?;

    let plain = tokio::task::spawn_blocking(|| -> std::io::Result<String> {
        let first = rpassword::prompt_password("Password: ")?;
        let second = rpassword::prompt_password("Repeat password: ")?;
        if first != second {
            return Err(std::io::Error::other("passwords do not match"));
        }
        Ok(first)
    })
    .await??;

    if plain.chars().count() < auth::MIN_PASSWORD_LEN {
        return Err(format!(
            "password must be at least {} characters",
            auth::MIN_PASSWORD_LEN
        )
        .into());
    }

    let created = seed::insert_admin(&db, username, email, &plain, first_name, last_name).await?;
    tracing::info!(id = %created["id"], "created admin {username}");
    Ok(())
}
