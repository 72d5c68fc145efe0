//! mailx - command-line front end for the mailx services
//!
//! Signs a Google account in and prints its messages and labels as JSON.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use mailx::{
    AuthService, CancelToken, GmailSessionFactory, GoogleCredentials, GoogleOAuth, LabelService,
    MailxError, MessageId, MessageService, OAuthClient, ServiceConfig, SessionResolver,
    SqliteStore, UserId, code_from_redirect,
};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mailx")]
#[command(about = "Read a Gmail mailbox through cached per-user sessions")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the Google consent URL and the state it carries
    AuthUrl,

    /// Finish sign-in with the code Google returned
    SignIn {
        /// Authorization code from the redirect
        #[arg(long, required_unless_present = "redirect_url")]
        code: Option<String>,

        /// Full redirect URL as shown in the browser
        #[arg(long, conflicts_with = "code")]
        redirect_url: Option<String>,

        /// State printed by auth-url; checked against the redirect URL
        #[arg(long, requires = "redirect_url")]
        state: Option<String>,
    },

    /// List the most recent messages, newest first
    Messages {
        #[arg(long)]
        user: String,

        /// Number of messages to list (defaults to the configured limit)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show a single message with its decoded HTML body
    Message {
        #[arg(long)]
        user: String,

        #[arg(long)]
        id: String,
    },

    /// List mailbox labels
    Labels {
        #[arg(long)]
        user: String,
    },

    /// Show one label with its message counts
    Label {
        #[arg(long)]
        user: String,

        /// Label id, e.g. INBOX or Label_12
        #[arg(long)]
        id: String,
    },
}

/// Services wired to the SQLite store and the Gmail API
struct App {
    config: ServiceConfig,
    auth: AuthService,
    messages: MessageService,
    labels: LabelService,
}

impl App {
    fn new(config: ServiceConfig) -> Result<Self> {
        let credentials = match GoogleCredentials::load() {
            Ok(credentials) => credentials,
            Err(e) => {
                if let Some(path) = GoogleCredentials::default_credentials_path() {
                    warn!(
                        "To configure Google access, either:\n\
                         1. Place your Google OAuth credentials at: {}\n\
                         2. Set GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET environment variables",
                        path.display()
                    );
                }
                return Err(e.context("Google credentials not found"));
            }
        };

        let db_path = config.database_path()?;
        let store = Arc::new(SqliteStore::new(&db_path)?);
        info!("Using database at {}", db_path.display());

        let oauth: Arc<dyn OAuthClient> =
            Arc::new(GoogleOAuth::new(credentials, config.request_timeout()));
        let factory = Arc::new(GmailSessionFactory::new(
            Arc::clone(&oauth),
            config.request_timeout(),
        ));
        let resolver = Arc::new(SessionResolver::new(store.clone(), factory));

        Ok(Self {
            auth: AuthService::new(oauth, store.clone(), store, resolver.clone()),
            messages: MessageService::new(resolver.clone(), &config)?,
            labels: LabelService::new(resolver),
            config,
        })
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let args = Args::parse();
    let app = App::new(ServiceConfig::load()?)?;

    if let Err(e) = run(&app, args.command) {
        if let Some(mailx_error) = e.downcast_ref::<MailxError>()
            && mailx_error.requires_reauthentication()
        {
            warn!("Sign in again with `mailx auth-url` followed by `mailx sign-in`");
        }
        return Err(e);
    }
    Ok(())
}

fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::AuthUrl => {
            let request = app.auth.authorization_url();
            print_json(&serde_json::json!({
                "url": request.url,
                "state": request.state,
            }))
        }
        Command::SignIn {
            code,
            redirect_url,
            state,
        } => {
            let code = match (code, redirect_url) {
                (Some(code), _) => code,
                (None, Some(redirect)) => code_from_redirect(&redirect, state.as_deref())?,
                (None, None) => bail!("either --code or --redirect-url is required"),
            };
            let profile = app.auth.complete_sign_in(&code)?;
            info!("Signed in user {}", profile.id);
            print_json(&profile)
        }
        Command::Messages { user, limit } => {
            let user = UserId::new(user);
            let messages = match limit {
                Some(limit) => {
                    let cancel = CancelToken::with_deadline(app.config.hydrate_deadline());
                    app.messages.get_messages_with(&user, limit, &cancel)?
                }
                None => app.messages.get_messages(&user)?,
            };
            print_json(&messages)
        }
        Command::Message { user, id } => {
            let message = app
                .messages
                .get_message_by_id(&UserId::new(user), &MessageId::new(id))?;
            print_json(&message)
        }
        Command::Labels { user } => {
            let labels = app.labels.get_labels(&UserId::new(user))?;
            print_json(&labels)
        }
        Command::Label { user, id } => {
            let label = app.labels.get_label(&UserId::new(user), &id)?;
            print_json(&label)
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
