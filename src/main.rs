//! Local chat loop: one user, messages read from stdin.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use medibot::config::{self, AssistantConfig};
use medibot::conversation::ConversationManager;
use medibot::db::sqlite::open_database;
use medibot::dialogue::{ContextStore, TurnProcessor};
use medibot::encyclopedia::WikipediaClient;
use medibot::knowledge::SqliteKnowledgeBase;
use medibot::llm::OllamaClient;

const LOCAL_USER_ID: i64 = 1;

fn main() -> ExitCode {
    medibot::init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = AssistantConfig::from_env();
    match serde_json::to_string(&config) {
        Ok(json) => tracing::debug!(config = %json, "Effective configuration"),
        Err(e) => tracing::warn!(error = %e, "Cannot serialize configuration"),
    }
    let conn = match open_database(&config.db_path) {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(path = %config.db_path.display(), error = %e, "Cannot open database");
            return ExitCode::FAILURE;
        }
    };

    let knowledge = SqliteKnowledgeBase::new(&conn);
    let log = ConversationManager::new(&conn);
    let contexts = ContextStore::new();
    let llm = if config.llm_enabled { connect_llm(&config) } else { None };
    let encyclopedia = match WikipediaClient::from_config(&config) {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::warn!(error = %e, "Encyclopedia disabled");
            None
        }
    };

    let mut processor = TurnProcessor::new(&contexts, &knowledge, &log, &config);
    if let Some(llm) = &llm {
        processor = processor.with_llm(llm);
    }
    if let Some(encyclopedia) = &encyclopedia {
        processor = processor.with_encyclopedia(encyclopedia);
    }

    println!("{} v{}. Escribe /reset para empezar de nuevo o /salir para terminar.", config::APP_NAME, config::APP_VERSION);
    match chat_loop(&processor) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Terminal I/O failed");
            ExitCode::FAILURE
        }
    }
}

/// Build the Ollama client. A missing model only warns: each turn falls back
/// on its own when the server cannot answer.
fn connect_llm(config: &AssistantConfig) -> Option<OllamaClient> {
    let client = match OllamaClient::from_config(config) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "LLM client unavailable, using deterministic responses");
            return None;
        }
    };
    match client.is_model_available() {
        Ok(true) => tracing::info!(model = client.model(), "LLM model available"),
        Ok(false) => match client.find_best_model() {
            Ok(Some(best)) => tracing::warn!(
                model = client.model(),
                installed = %best,
                "LLM model not installed, set MEDIBOT_OLLAMA_MODEL to an installed one"
            ),
            _ => tracing::warn!(model = client.model(), "LLM model not installed"),
        },
        Err(e) => tracing::warn!(error = %e, "Ollama not reachable at startup"),
    }
    Some(client)
}

fn chat_loop(processor: &TurnProcessor<'_>) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }

        match line.trim() {
            "/salir" => return Ok(()),
            "/reset" => {
                processor.reset_context(LOCAL_USER_ID);
                writeln!(stdout, "Contexto reiniciado.")?;
            }
            text => {
                let reply = processor.process_message(LOCAL_USER_ID, text, None);
                writeln!(stdout, "{reply}\n")?;
            }
        }
    }
}
