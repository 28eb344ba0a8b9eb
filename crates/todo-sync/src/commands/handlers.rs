use anyhow::{Context, Result, anyhow, bail};
use todo_sync_app::{AuthProvider, AuthService, RemoteStore, SessionFile, TaskBoard, TaskWriter};
use todo_sync_core::{FilterMode, SignUpForm, Task, TaskDraft, TaskId, TaskList};
use tracing::info;

use super::view::TaskView;
use crate::{Command, LsFormat};

pub async fn run_tasks<S>(command: Command, store: S, view: TaskView) -> Result<()>
where
    S: RemoteStore + Clone + 'static,
{
    match command {
        Command::Add { title, description } => handle_add(&TaskWriter::new(store), title, description).await,
        Command::Ls { filter, format } => handle_ls(&store, view, filter, format).await,
        Command::Edit {
            id,
            title,
            description,
        } => handle_edit(&TaskWriter::new(store), &id, title, description).await,
        Command::Toggle { id } => handle_toggle(&TaskWriter::new(store), &id).await,
        Command::Rm { id } => handle_rm(&TaskWriter::new(store), &id).await,
        Command::Watch { filter } => handle_watch(store, view, filter).await,
        Command::Login { .. } | Command::Register { .. } | Command::Logout => {
            Err(anyhow!("account commands are not task commands"))
        }
    }
}

/// Current task list, read once.
pub async fn load_list<S: RemoteStore>(store: &S) -> Result<TaskList> {
    Ok(store.fetch().await?.to_task_list())
}

fn find_task(list: &TaskList, id: &str) -> Result<Task> {
    list.get(&TaskId::from(id))
        .cloned()
        .ok_or_else(|| anyhow!("task {id} not found"))
}

async fn handle_add<S: RemoteStore>(
    writer: &TaskWriter<S>,
    title: String,
    description: String,
) -> Result<()> {
    let task = writer.add_task(TaskDraft::new(title, description)).await?;
    println!("created task: {}", task.id);
    Ok(())
}

async fn handle_ls<S: RemoteStore>(
    store: &S,
    view: TaskView,
    filter: FilterMode,
    format: LsFormat,
) -> Result<()> {
    let tasks = load_list(store).await?.filtered(filter);
    match format {
        LsFormat::Table => println!("{}", view.render_table(&tasks, filter)),
        LsFormat::Json => println!("{}", TaskView::render_json(&tasks)?),
    }
    Ok(())
}

async fn handle_edit<S: RemoteStore>(
    writer: &TaskWriter<S>,
    id: &str,
    title: Option<String>,
    description: Option<String>,
) -> Result<()> {
    if title.is_none() && description.is_none() {
        bail!("nothing to change: pass --title and/or --description");
    }
    let task = find_task(&load_list(writer.store()).await?, id)?;
    let edited = task.edited(
        title.unwrap_or_else(|| task.title.clone()),
        description.unwrap_or_else(|| task.description.clone()),
    );
    writer.update_task(&edited).await?;
    println!("updated task: {}", edited.id);
    Ok(())
}

async fn handle_toggle<S: RemoteStore>(writer: &TaskWriter<S>, id: &str) -> Result<()> {
    let task = find_task(&load_list(writer.store()).await?, id)?;
    let completed = writer.toggle_completion(&task).await?;
    let state = if completed { "completed" } else { "reopened" };
    println!("{state}: {} ({})", task.title, task.id);
    Ok(())
}

async fn handle_rm<S: RemoteStore>(writer: &TaskWriter<S>, id: &str) -> Result<()> {
    let task = find_task(&load_list(writer.store()).await?, id)?;
    writer.delete_task(&task).await?;
    println!("deleted task: {}", task.id);
    Ok(())
}

async fn handle_watch<S>(store: S, view: TaskView, filter: FilterMode) -> Result<()>
where
    S: RemoteStore + Clone + 'static,
{
    let mut board = TaskBoard::open(store);
    board.set_filter(filter);
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        let changed = tokio::select! {
            changed = board.changed() => changed,
            signal = &mut interrupted => {
                signal.context("failed to listen for Ctrl-C")?;
                false
            }
        };
        if !changed {
            break;
        }
        println!("{}\n", view.render_table(&board.visible(), board.filter()));
    }

    if board.is_closed() {
        info!("Subscription ended");
    }
    board.close();
    Ok(())
}

pub async fn handle_login<P: AuthProvider>(
    auth: &AuthService<P>,
    sessions: &SessionFile,
    email: &str,
    password: &str,
) -> Result<()> {
    let session = auth
        .sign_in(email, password)
        .await
        .map_err(|failure| anyhow!(failure.sign_in_message()))?;
    sessions.save(&session)?;
    println!("signed in as {}", session.email);
    Ok(())
}

pub async fn handle_register<P: AuthProvider>(
    auth: &AuthService<P>,
    sessions: &SessionFile,
    form: SignUpForm,
) -> Result<()> {
    let session = auth
        .sign_up(&form)
        .await
        .map_err(|err| anyhow!(err.describe_user_facing()))?;
    sessions.save(&session)?;
    println!("registered and signed in as {}", session.email);
    Ok(())
}

pub fn handle_logout(sessions: &SessionFile) -> Result<()> {
    if sessions.clear()? {
        println!("signed out");
    } else {
        println!("not signed in");
    }
    Ok(())
}
