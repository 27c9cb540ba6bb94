use std::{fs::OpenOptions, net::SocketAddr, path::PathBuf, sync::Arc};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::Handle;
use clap::Parser;
use tower_http::trace::TraceLayer;

use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use domus::{
    AppState, Bot, ConsoleTransport, JsonFileStore, access::AccessList, build_router,
    default_renderer, graceful_shutdown, ledger::Ledger, user::UserId,
};

/// The webhook server and chat bot for domus.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The port to receive webhooks on.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// File path to the ledger of every user's expenses.
    #[arg(long, default_value = "gastos.json")]
    ledger_path: PathBuf,

    /// File path to the list of users allowed to talk to the bot.
    #[arg(long, default_value = "whitelist.json")]
    access_list_path: PathBuf,

    /// The shared secret the sales platform sends with each webhook.
    #[arg(
        long,
        env = "WEBHOOK_TOKEN",
        default_value = "a984a7843f984e5b89a2fe61eabbf19c",
        hide_env_values = true
    )]
    webhook_token: String,

    /// The canonical timezone used to decide today's date, e.g. "America/Sao_Paulo".
    #[arg(long, default_value = "America/Sao_Paulo")]
    timezone: String,

    /// Chat with the bot on this terminal as the given phone number or user ID.
    #[arg(long)]
    console_user: Option<String>,

    /// Directory where charts and spreadsheets sent on the terminal are saved.
    #[arg(long, default_value = "outbox")]
    outbox: PathBuf,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));

    let ledger = JsonFileStore::<Ledger>::new(&args.ledger_path);
    let access_list = JsonFileStore::<AccessList>::new(&args.access_list_path);
    tracing::info!(
        "Using the ledger at {} and the access list at {}",
        ledger.path().display(),
        access_list.path().display()
    );

    let app_state = match AppState::new(
        ledger,
        access_list,
        &args.webhook_token,
        &args.timezone,
    ) {
        Ok(state) => state,
        Err(error) => {
            tracing::error!("Could not start: {error}");
            std::process::exit(1);
        }
    };

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_router(app_state.clone()));

    tracing::info!("Webhook server listening on {}", addr);
    let server = tokio::spawn(
        axum_server::bind(addr)
            .handle(handle.clone())
            .serve(router.into_make_service()),
    );

    if let Some(console_user) = args.console_user {
        let user = if console_user.contains('@') {
            UserId::normalized(&console_user)
        } else {
            match UserId::from_phone_number(&console_user) {
                Some(user) => user,
                None => {
                    tracing::error!("\"{console_user}\" is not a phone number or user ID");
                    std::process::exit(1);
                }
            }
        };
        tracing::info!("Chatting on the terminal as {user}, end input to stop.");

        let bot = Bot::new(app_state, default_renderer());
        let mut transport = ConsoleTransport::stdio(user, args.outbox);

        if let Err(error) = bot.run(&mut transport).await {
            tracing::error!("The bot stopped: {error}");
        }

        handle.graceful_shutdown(None);
    }

    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => tracing::error!("The webhook server stopped: {error}"),
        Err(error) => tracing::error!("The webhook server task failed: {error}"),
    }
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
