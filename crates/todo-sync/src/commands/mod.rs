use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};
use time::UtcOffset;
use todo_sync_app::{AppConfig, AuthService, SessionFile};
use todo_sync_core::SignUpForm;
use todo_sync_firebase::{FirebaseAuth, RtdbStore};
use todo_sync_store::MemoryStore;
use tracing::info;

use crate::Command;

mod handlers;
mod view;

use view::TaskView;

/// Global flags shared by every command.
pub struct Options {
    pub config: Option<PathBuf>,
    pub offline: bool,
    pub offset: UtcOffset,
}

pub async fn run(command: Command, options: &Options) -> Result<()> {
    let config = AppConfig::load(options.config.as_deref())?;
    let view = TaskView::new(options.offset);

    match command {
        Command::Logout => handlers::handle_logout(&SessionFile::default_location()?),
        Command::Login { email, password } => {
            let auth = firebase_auth(&config, options)?;
            handlers::handle_login(&auth, &SessionFile::default_location()?, &email, &password).await
        }
        Command::Register {
            email,
            password,
            confirm,
        } => {
            let auth = firebase_auth(&config, options)?;
            let form = SignUpForm::new(email, password, confirm);
            handlers::handle_register(&auth, &SessionFile::default_location()?, form).await
        }
        other if options.offline => {
            let path = config.data_file()?;
            info!(path = %path.display(), "Using offline store");
            handlers::run_tasks(other, MemoryStore::open(&path)?, view).await
        }
        other => {
            let session = SessionFile::default_location()?
                .load()?
                .ok_or_else(|| anyhow!("not signed in: run `todo-sync login` first (or pass --offline)"))?;
            let store = RtdbStore::new(config.firebase()?)?.with_auth(session.id_token);
            handlers::run_tasks(other, store, view).await
        }
    }
}

fn firebase_auth(config: &AppConfig, options: &Options) -> Result<AuthService<FirebaseAuth>> {
    if options.offline {
        bail!("accounts live in Firebase; drop --offline to sign in or register");
    }
    Ok(AuthService::new(FirebaseAuth::new(config.firebase()?.clone())))
}
