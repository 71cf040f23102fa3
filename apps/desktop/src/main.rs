use anyhow::Result;
use clap::{Parser, Subcommand};
use controller::CategoryScreen;
use notify::{AlertDispatcher, StaticPermission};
use shared::{
    domain::{CategoryDraft, CategoryId},
    nav::NavHandle,
};
use storage::CategoryStore;
use tokio::time::{timeout, Duration};

mod config;

use config::{load_settings, normalize_database_url};

#[derive(Parser, Debug)]
#[command(name = "pantry", about = "Manage the local category list")]
struct Args {
    /// Overrides the configured database url (bare paths accepted).
    #[arg(long)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every category as JSON.
    List,
    /// Add a category and wait for its alert.
    Add {
        title: String,
        #[arg(default_value = "")]
        description: String,
    },
    /// Rewrite both fields of an existing category.
    Update {
        id: i64,
        title: String,
        description: String,
    },
    /// Delete a category by id.
    Delete { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(url) = args.database_url {
        settings.database_url = url;
    }
    let database_url = normalize_database_url(&settings.database_url);
    let alert_delay = Duration::from_secs(settings.alert_delay_seconds);

    let store = CategoryStore::open(&database_url).await?;
    store.health_check().await?;

    let alerts = AlertDispatcher::new(alert_delay);
    let mut alert_rx = alerts.subscribe();
    let mut screen = CategoryScreen::mount(
        store,
        alerts,
        &StaticPermission::granted(),
        NavHandle::with_default_screens(),
    )
    .await?;
    if let Some(notice) = screen.permission_notice() {
        eprintln!("{notice}");
    }

    let expect_alert = matches!(args.command, Command::Add { .. } | Command::Update { .. });
    match args.command {
        Command::List => {}
        Command::Add { title, description } => {
            screen.open_add_form();
            screen
                .submit_add(CategoryDraft { title, description })
                .await?;
        }
        Command::Update {
            id,
            title,
            description,
        } => {
            if screen.select_for_update(CategoryId(id)).is_none() {
                eprintln!("no category with id {id}");
                screen.unmount();
                return Ok(());
            }
            screen
                .submit_update(CategoryDraft { title, description })
                .await?;
        }
        Command::Delete { id } => {
            screen.remove(CategoryId(id)).await?;
        }
    }

    println!("{}", serde_json::to_string_pretty(screen.categories())?);

    if expect_alert {
        match timeout(alert_delay + Duration::from_secs(1), alert_rx.recv()).await {
            Ok(Ok(alert)) => println!("[alert] {}: {}", alert.title, alert.body),
            _ => tracing::warn!("no alert arrived before shutdown"),
        }
    }

    screen.unmount();
    Ok(())
}
