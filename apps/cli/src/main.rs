use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, ClientSettings, DeleteOutcome, FileCredentialBackend, LingoClient,
    ServiceAddressing,
};
use shared::{
    domain::{EntryId, Service},
    protocol::VocabularyPatch,
};
use tracing_subscriber::EnvFilter;

mod prompt;

use prompt::TerminalPrompt;

#[derive(Parser, Debug)]
#[command(name = "lingo", about = "Vocabulary and translation client")]
struct Cli {
    /// Settings file; defaults to ./client.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Talk to one combined service at this base url.
    #[arg(long, conflicts_with = "origin")]
    base_url: Option<String>,
    /// Talk to split services behind path prefixes on this origin.
    #[arg(long)]
    origin: Option<String>,
    #[arg(long)]
    credential_path: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register and store the issued API key.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Check the stored API key with the user service.
    Whoami,
    Vocab {
        #[command(subcommand)]
        action: VocabCommand,
    },
    Translate {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Probe each service's health endpoint.
    Health,
}

#[derive(Subcommand, Debug)]
enum VocabCommand {
    List,
    Add {
        english: String,
        spanish: String,
    },
    Show {
        id: i64,
    },
    Update {
        id: i64,
        #[arg(long)]
        english: Option<String>,
        #[arg(long)]
        spanish: Option<String>,
    },
    Delete {
        id: i64,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

impl Cli {
    fn apply_overrides(&self, settings: &mut ClientSettings) {
        if let Some(base_url) = &self.base_url {
            settings.addressing = ServiceAddressing::single(base_url.clone());
        }
        if let Some(origin) = &self.origin {
            match &mut settings.addressing {
                ServiceAddressing::PerService { origin: current, .. } => *current = origin.clone(),
                ServiceAddressing::SingleOrigin { .. } => {
                    settings.addressing = ServiceAddressing::split(origin.clone());
                }
            }
        }
        if let Some(path) = &self.credential_path {
            settings.credential_path = Some(path.clone());
        }
    }

    fn assume_yes(&self) -> bool {
        matches!(
            self.command,
            Command::Vocab {
                action: VocabCommand::Delete { yes: true, .. }
            }
        )
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    cli.apply_overrides(&mut settings);

    let credentials = FileCredentialBackend::new(settings.resolved_credential_path()?);
    let prompt = TerminalPrompt::new(cli.assume_yes());
    // Not `LingoClient::start`: every command that prints the table loads it
    // itself, so a startup load would only double the request.
    let client = LingoClient::new(&settings, Arc::new(credentials), Arc::new(prompt)).await?;

    let ok = run(&client, cli.command).await;
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Runs one command; alerts have already been printed when this returns false.
async fn run(client: &LingoClient, command: Command) -> bool {
    match command {
        Command::Register { username, password } => {
            let Ok(user) = client.registration.register(&username, &password).await else {
                return false;
            };
            println!("API key: {}", user.api_key);
            print_vocabulary(client).await;
            true
        }
        Command::Whoami => match client.registration.validate_key().await {
            Ok(validation) if validation.valid => {
                let username = validation.username.as_deref().unwrap_or("<unknown>");
                match validation.user_id {
                    Some(user_id) => println!("API key is valid for {username} (user {user_id})"),
                    None => println!("API key is valid for {username}"),
                }
                true
            }
            Ok(_) => {
                println!("API key is not valid");
                false
            }
            Err(_) => false,
        },
        Command::Vocab { action } => run_vocab(client, action).await,
        Command::Translate { text } => {
            let text = text.join(" ");
            let result = client.translation.translate(&text).await;
            let screen = client.view.snapshot().await;
            match result {
                Ok(result) => {
                    println!("{}", screen.translation_output);
                    if let Some(preprocessed) = &screen.preprocessing_panel {
                        println!("Preprocessed: {preprocessed}");
                    }
                    if let Some(note) = &result.note {
                        println!("Note: {note}");
                    }
                    true
                }
                Err(err) if err.is_validation() => false,
                Err(_) => {
                    println!("{}", screen.translation_output);
                    false
                }
            }
        }
        Command::Health => {
            let mut healthy = true;
            for service in Service::ALL {
                match client.gateway.health(service).await {
                    Ok(banner) => println!("{service}: {}", banner.trim()),
                    Err(err) => {
                        healthy = false;
                        println!("{service}: {}", err.alert_text());
                    }
                }
            }
            healthy
        }
    }
}

async fn run_vocab(client: &LingoClient, action: VocabCommand) -> bool {
    let vocabulary = &client.vocabulary;
    let ok = match action {
        VocabCommand::List => vocabulary.load().await.is_ok(),
        VocabCommand::Add { english, spanish } => {
            let (form_english, form_spanish) = (english.clone(), spanish.clone());
            client
                .view
                .update(|screen| {
                    screen.english_term = form_english;
                    screen.spanish_term = form_spanish;
                })
                .await;
            vocabulary.add(&english, &spanish).await.is_ok()
        }
        VocabCommand::Show { id } => match vocabulary.get(EntryId(id)).await {
            Ok(entry) => {
                println!("{}  {}  {}", entry.id, entry.english, entry.spanish);
                return true;
            }
            Err(_) => false,
        },
        VocabCommand::Update {
            id,
            english,
            spanish,
        } => vocabulary
            .update(EntryId(id), VocabularyPatch { english, spanish })
            .await
            .is_ok(),
        VocabCommand::Delete { id, .. } => match vocabulary.delete(EntryId(id)).await {
            Ok(DeleteOutcome::Deleted) => true,
            Ok(DeleteOutcome::Declined) => {
                println!("Nothing deleted");
                return true;
            }
            Err(_) => false,
        },
    };

    if ok {
        print_vocabulary(client).await;
    }
    ok
}

async fn print_vocabulary(client: &LingoClient) {
    for line in client.view.snapshot().await.vocabulary.to_lines() {
        println!("{line}");
    }
}
