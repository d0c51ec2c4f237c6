use clap::Parser;
use quizhost::{config::Config, db::Db, router, AppState};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "quizhost=debug,tower=info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .init();

    let config = Config::parse();

    let db = Db::new(&config.database_url).await?;
    for email in &config.admin_emails {
        let email = quizhost::utils::normalize_email(email);
        if db.set_admin(&email).await? {
            tracing::info!("{email} has admin rights");
        } else {
            tracing::warn!("admin email {email} does not belong to a registered user");
        }
    }

    let listener = tokio::net::TcpListener::bind(&config.address).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    let app = router(AppState::new(db, config));
    axum::serve(listener, app).await?;

    Ok(())
}
