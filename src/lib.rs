pub mod api;
pub mod cli;
pub mod columns;
pub mod console;
pub mod data;
pub mod dates;
pub mod edits;
pub mod filter;
pub mod io_utils;
pub mod rows;
pub mod selection;
pub mod session;
pub mod settings;
pub mod table;

use std::{
    env,
    io::{self, Write},
    sync::OnceLock,
};

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use log::{LevelFilter, debug, info};
use serde_json::json;

use crate::{
    api::{ApiClient, HttpTransport, PendingBatch},
    cli::{Cli, Commands, ConfigAction},
    columns::ColumnRole,
    console::Console,
    data::Row,
    filter::parse_filter_arg,
    session::{IntimationKind, Session, SessionOptions},
    settings::{API_BASE_KEY, FileStore, SettingsStore, USERNAME_KEY},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("intimation_desk", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match &cli.command {
        Commands::Login(args) => handle_login(&cli, &args.username),
        Commands::Logout => handle_logout(&cli),
        Commands::Pending(args) => handle_pending(&cli, args),
        Commands::Send(args) => handle_send(&cli, args),
        Commands::UpdateDate(args) => handle_update_date(&cli, args),
        Commands::Classify(args) => handle_classify(&cli, args),
        Commands::Config(args) => handle_config(&cli, &args.action),
        Commands::Console(args) => handle_console(&cli, args.kind),
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn open_store(cli: &Cli) -> Result<FileStore> {
    FileStore::open(&cli.state).with_context(|| format!("Opening settings {:?}", cli.state))
}

fn session_options(cli: &Cli) -> SessionOptions {
    SessionOptions {
        hidden_trailing: cli.hidden_trailing,
        expected_columns: cli.expected_columns,
    }
}

/// The command-line override wins over the stored one for this run.
fn api_base(cli: &Cli, store: &FileStore) -> String {
    let stored = store.get(API_BASE_KEY);
    settings::resolve_api_base(cli.api_base.as_deref().or(stored.as_deref()))
}

fn connect(cli: &Cli, store: &FileStore) -> Result<ApiClient<HttpTransport>> {
    let base = api_base(cli, store);
    debug!("Using API base {base}");
    Ok(ApiClient::connect(base)?)
}

fn require_user(store: &FileStore) -> Result<String> {
    match settings::stored_username(store) {
        Some(username) => Ok(username),
        None => bail!("User not logged in"),
    }
}

/// Signs in the stored user's session for `kind` and loads pending rows.
fn open_session(
    cli: &Cli,
    store: &FileStore,
    api: &ApiClient<HttpTransport>,
    kind: IntimationKind,
) -> Result<Session> {
    let username = require_user(store)?;
    let mut session = Session::new(username, kind, session_options(cli));
    let report = session
        .refresh(api, today())
        .with_context(|| format!("Failed to load {} data", kind.label()))?;
    if let Some(warning) = console::describe_load(&report) {
        eprintln!("{warning}");
    }
    Ok(session)
}

fn apply_filters(session: &mut Session, filters: &[String]) -> Result<()> {
    if filters.is_empty() {
        return Ok(());
    }
    let parsed = filters
        .iter()
        .map(|raw| parse_filter_arg(raw))
        .collect::<Result<Vec<_>>>()?;
    session.filter_by(
        parsed
            .iter()
            .map(|(column, text)| (column.as_str(), text.as_str())),
    );
    Ok(())
}

fn handle_login(cli: &Cli, username: &str) -> Result<()> {
    let username = username.trim();
    if username.is_empty() {
        bail!("Please select a username");
    }
    let mut store = open_store(cli)?;
    let api = connect(cli, &store)?;
    let batch = api.login(username)?;
    store
        .set(USERNAME_KEY, username)
        .with_context(|| format!("Saving username to {:?}", store.path()))?;
    info!("Signed in as {username}");

    let mut session = Session::new(username, IntimationKind::First, session_options(cli));
    let ticket = session.begin_fetch();
    if let Some(report) = session.apply_fetch(ticket, batch) {
        if let Some(warning) = console::describe_load(&report) {
            eprintln!("{warning}");
        }
    }
    print!("{}", console::render_session(&session));
    Ok(())
}

fn handle_logout(cli: &Cli) -> Result<()> {
    let mut store = open_store(cli)?;
    match settings::stored_username(&store) {
        Some(username) => {
            store.remove(USERNAME_KEY)?;
            info!("Signed out {username}");
        }
        None => info!("No user was signed in"),
    }
    Ok(())
}

fn handle_pending(cli: &Cli, args: &cli::PendingArgs) -> Result<()> {
    let store = open_store(cli)?;
    let api = connect(cli, &store)?;
    let mut session = open_session(cli, &store, &api, args.kind)?;
    apply_filters(&mut session, &args.filters)?;
    if args.json {
        let rows = session.store().view().collect::<Vec<&Row>>();
        let document = json!({
            "kind": args.kind.label(),
            "dateRange": session.date_range(),
            "columns": session.columns(),
            "rows": rows,
        });
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        print!("{}", console::render_session(&session));
    }
    Ok(())
}

fn handle_send(cli: &Cli, args: &cli::SendArgs) -> Result<()> {
    let store = open_store(cli)?;
    let api = connect(cli, &store)?;
    let mut session = open_session(cli, &store, &api, args.kind)?;
    apply_filters(&mut session, &args.filters)?;

    for edit in &args.edits {
        session
            .edit(&edit.id, edit.field, &edit.value)
            .with_context(|| format!("Editing {} of row {}", edit.field, edit.id))?;
    }
    if args.all {
        session.select_all_visible();
    } else {
        for id in &args.ids {
            session.select(id.clone());
        }
    }

    let prompt = console::send_prompt(&session)?;
    if !args.yes {
        let mut stdout = io::stdout();
        if !console::confirm(&prompt, &mut io::stdin().lock(), &mut stdout)? {
            writeln!(stdout, "Cancelled")?;
            return Ok(());
        }
    }
    let outcome = session.send(&api, today())?;
    print!("{}", console::describe_send(&outcome));
    Ok(())
}

fn handle_update_date(cli: &Cli, args: &cli::UpdateDateArgs) -> Result<()> {
    let store = open_store(cli)?;
    let api = connect(cli, &store)?;
    let mut session = open_session(cli, &store, &api, args.kind)?;
    let canonical = session
        .update_delivery_date(&api, &args.id, &args.date)
        .context("Error updating delivery date")?;
    println!("Delivery date of {} updated to {canonical}", args.id);
    Ok(())
}

fn handle_classify(cli: &Cli, args: &cli::ClassifyArgs) -> Result<()> {
    let rows = io_utils::read_rows(&args.input)?;
    if rows.is_empty() {
        bail!("No pending jobs data available");
    }
    let mut session = Session::new("", args.kind, session_options(cli));
    let report = session.load(PendingBatch {
        rows,
        date_range: None,
    });
    let summaries = columns::describe(session.columns(), session.roles());

    if args.json {
        let roles = ColumnRole::TRACKED
            .iter()
            .map(|role| {
                let index = session.roles().index_or_missing(*role);
                (role.label().to_string(), json!(index))
            })
            .collect::<serde_json::Map<_, _>>();
        let document = json!({
            "rows": report.rows,
            "visibleColumns": report.visible_columns,
            "hiddenTrailing": cli.hidden_trailing,
            "raggedRows": report.ragged_rows,
            "drift": report.drift.map(|drift| json!({ "expected": drift.expected, "found": drift.found })),
            "roles": roles,
            "columns": summaries,
        });
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    let headers = ["#", "Key", "Display", "Date", "Role"].map(str::to_string);
    let table_rows = summaries
        .iter()
        .map(|summary| {
            vec![
                summary.index.to_string(),
                summary.key.clone(),
                summary.display.clone(),
                if summary.date_like { "yes" } else { "" }.to_string(),
                match summary.role {
                    ColumnRole::Plain => String::new(),
                    role => role.to_string(),
                },
            ]
        })
        .collect::<Vec<_>>();
    print!("{}", table::render_table(&headers, &table_rows));
    if let Some(warning) = console::describe_load(&report) {
        println!("{warning}");
    }
    Ok(())
}

fn handle_config(cli: &Cli, action: &ConfigAction) -> Result<()> {
    let mut store = open_store(cli)?;
    match action {
        ConfigAction::Show => {
            let user = settings::stored_username(&store);
            println!("User: {}", user.as_deref().unwrap_or("(not signed in)"));
            let source = if cli.api_base.is_some() {
                "command line"
            } else if store.get(API_BASE_KEY).is_some() {
                "stored"
            } else {
                "default"
            };
            println!("API base: {} ({source})", api_base(cli, &store));
        }
        ConfigAction::SetApiBase { url } => {
            let resolved = settings::store_api_base(&mut store, url)?;
            info!("API base override saved to {:?}", store.path());
            println!("API base: {resolved}");
        }
        ConfigAction::ClearApiBase => {
            store.remove(API_BASE_KEY)?;
            println!("API base: {}", settings::resolve_api_base(None));
        }
    }
    Ok(())
}

fn handle_console(cli: &Cli, kind: IntimationKind) -> Result<()> {
    let store = open_store(cli)?;
    let api = connect(cli, &store)?;
    let mut session = open_session(cli, &store, &api, kind)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    Console::new(&mut session, &api, today()).run(stdin.lock(), &mut stdout)
}
