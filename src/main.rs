use clap::Parser;
use enrollment_sync::config::cli::{CartAction, Command, SearchArgs, SelectAction};
use enrollment_sync::domain::model::{CartItem, QueryParams, ReportStatus};
use enrollment_sync::domain::ports::{ConfigProvider, CredentialSource};
use enrollment_sync::utils::error::{ErrorSeverity, SyncError};
use enrollment_sync::utils::logger;
use enrollment_sync::{
    AppSettings, CliConfig, EnrollmentSession, EnvCredentials, QueryOutcome, StaticCredentials,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }
    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = run(&config).await {
        tracing::error!(
            "❌ {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(config: &CliConfig) -> Result<(), SyncError> {
    let settings = config.resolve_settings()?;

    let credentials: Arc<dyn CredentialSource> = match &config.token {
        Some(token) => Arc::new(StaticCredentials::signed_in(token.clone())),
        None => Arc::new(EnvCredentials::new(settings.token_env())),
    };
    let session = EnrollmentSession::open(settings, credentials)?;

    match &config.command {
        Command::Select { action } => select(&session, action),
        Command::Cart { action } => cart(&session, action),
        Command::Submit => submit(&session).await,
        Command::Search(args) => search(&session, args).await,
    }
}

fn select(session: &EnrollmentSession<AppSettings>, action: &SelectAction) -> Result<(), SyncError> {
    let selection = session.selection();
    match action {
        SelectAction::Add { id } => {
            selection.add(id.clone())?;
            println!("✅ Selected '{}' ({} in selection)", id, selection.len());
        }
        SelectAction::Remove { id } => {
            if selection.remove(id) {
                println!("🗑️  Removed '{}'", id);
            } else {
                println!("'{}' was not selected", id);
            }
        }
        SelectAction::List => {
            if selection.is_empty() {
                println!("Selection is empty");
            }
            for id in selection.ids() {
                println!("- {}", id);
            }
        }
        SelectAction::Clear => {
            selection.clear();
            println!("Selection cleared");
        }
    }
    Ok(())
}

fn cart(session: &EnrollmentSession<AppSettings>, action: &CartAction) -> Result<(), SyncError> {
    let cart = session.cart();
    match action {
        CartAction::Add {
            id,
            title,
            price,
            quantity,
        } => {
            let mut item = CartItem::new(id.clone(), title.clone(), *price);
            item.quantity = *quantity;
            cart.add(item)?;
            println!("✅ Added '{}', cart total {:.2}", id, cart.total());
        }
        CartAction::Remove { id } => {
            cart.remove(id);
            println!("Cart total {:.2}", cart.total());
        }
        CartAction::List => {
            for item in cart.items() {
                println!(
                    "- {} {} × {} = {:.2}",
                    item.id,
                    item.title,
                    item.quantity.unwrap_or(1).max(1),
                    item.line_total()
                );
            }
            println!("Total: {:.2}", cart.total());
        }
        CartAction::Clear => {
            cart.clear();
            println!("Cart cleared");
        }
    }
    Ok(())
}

async fn submit(session: &EnrollmentSession<AppSettings>) -> Result<(), SyncError> {
    let report = session.coordinator().submit().await?;

    for outcome in &report.outcomes {
        match &outcome.error_message {
            None => println!("✅ {}", outcome.id),
            Some(reason) => println!("❌ {}: {}", outcome.id, reason),
        }
    }
    match report.status() {
        ReportStatus::AllSucceeded => {
            println!("Enrolled in {} formation(s)", report.successful_count)
        }
        ReportStatus::PartialFailure => println!(
            "Enrolled in {} formation(s), {} failed; select them again to retry",
            report.successful_count,
            report.failed_entries.len()
        ),
        ReportStatus::TotalFailure => println!("No enrollment went through"),
    }
    Ok(())
}

async fn search(
    session: &EnrollmentSession<AppSettings>,
    args: &SearchArgs,
) -> Result<(), SyncError> {
    let controller = session.query_controller();
    let limit = session.config().page_size();

    let offset = args
        .page
        .saturating_sub(1)
        .checked_mul(limit)
        .ok_or_else(|| SyncError::InvalidConfigValueError {
            field: "page".to_string(),
            value: args.page.to_string(),
            reason: format!("No such page with {} formations per page", limit),
        })?;
    let params = QueryParams {
        limit,
        offset,
        search: args.search.clone(),
        level: args.level.clone(),
        location: args.location.clone(),
    };
    let handle = controller
        .replace_params(params)
        .or_else(|| controller.refetch());

    let Some(handle) = handle else {
        return Ok(());
    };
    if let QueryOutcome::Failed(failure) = handle.outcome().await {
        return Err(failure.into());
    }

    let snapshot = controller.snapshot();
    for formation in &snapshot.items {
        println!(
            "{:>6}  {}  [{}] {} | {:.2} ({} seats)",
            formation.id,
            formation.title,
            formation.level,
            formation.location,
            formation.price,
            formation.seats
        );
    }
    println!(
        "Page {}/{}, {} formation(s)",
        snapshot.pagination.current_page(),
        snapshot.pagination.pages,
        snapshot.pagination.total
    );
    Ok(())
}
