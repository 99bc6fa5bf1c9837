use clap::Parser;
use groupbridge::{app_state, http::setup_http_server, init_telemetry, settings::config::Settings};
use tokio::time::sleep;
use tracing::info;

#[derive(Parser)]
#[command(name = "groupbridge")]
#[command(about = "Serves local and LDAP directory groups as one group graph")]
#[clap(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Parser)]
enum Commands {
    /// Show current configuration and exit
    Config,
    /// Start the groupbridge server (default)
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env.local wins over .env, real environment variables win over both
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command.as_ref().unwrap_or(&Commands::Run) {
        Commands::Config => {
            let settings = Settings::new()?;
            println!("{:#?}", &settings);
            return Ok(());
        }
        Commands::Run => {}
    }

    let mut handles = vec![];

    let settings = Settings::new()?;
    init_telemetry::init_telemetry_and_tracing(&settings.telemetry)?;

    let app_state = app_state::AppState::new(settings).await?;
    if app_state.settings.directory.enabled && !app_state.resolver.directory_available().await {
        tracing::warn!("Directory is not reachable, serving local groups only until it is");
    }

    {
        let handle =
            setup_http_server(app_state.clone(), &app_state.settings.api.bind_address).await?;
        handles.push(handle);
    }

    sleep(std::time::Duration::from_millis(100)).await;

    loop {
        handles.retain(|handle| !handle.is_finished());

        if handles.is_empty() {
            info!("All tasks are done");
            break;
        }

        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
    }

    Ok(())
}
