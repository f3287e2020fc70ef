//! mailerd CLI — operator interface to the email delivery queue.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use domus_mailer::config::Config;
use domus_mailer::dispatcher::Dispatcher;
use domus_mailer::model::{TaskId, TaskStatus, truncate_chars};
use domus_mailer::scheduler::Scheduler;
use domus_mailer::store::{PgTaskStore, TaskStore};
use domus_mailer::telemetry::init_tracing;
use domus_mailer::transport::{SmtpMailer, Transport};
use domus_mailer::worker::DeliveryWorker;
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "mailerd", about = "Durable email delivery queue")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the delivery daemon (scheduler + worker pool)
    Serve,
    /// Enqueue an email
    Send {
        /// Recipient address
        to: String,
        /// Subject line
        subject: String,
        /// Message body
        body: String,
        /// Deliver inline instead of leaving the task for the daemon
        #[arg(long)]
        wait: bool,
    },
    /// Task audit-trail operations
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// List recent tasks
    List {
        /// Filter by status (queued, retrying, sent, failed)
        #[arg(long)]
        status: Option<String>,
        /// Maximum tasks to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Show a task
    Show {
        /// Task ID
        id: String,
        /// Print the full task as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cmd_serve().await,
        Command::Send {
            to,
            subject,
            body,
            wait,
        } => cmd_send(to, subject, body, wait).await,
        Command::Task { action } => {
            let config = Config::from_env()?;
            let store = connect(&config).await?;
            match action {
                TaskAction::List { status, limit } => cmd_task_list(&store, status, limit).await,
                TaskAction::Show { id, json } => cmd_task_show(&store, id, json).await,
            }
        }
    }
}

async fn connect(config: &Config) -> anyhow::Result<PgTaskStore> {
    let store = PgTaskStore::connect(config.database_url.expose_secret()).await?;
    store.migrate().await?;
    Ok(store)
}

async fn cmd_serve() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing()?;

    let store = Arc::new(connect(&config).await?);
    let store: Arc<dyn TaskStore> = store;
    let transport: Arc<dyn Transport> = Arc::new(SmtpMailer::new(&config.smtp, &config.mailer)?);

    let shutdown = CancellationToken::new();
    let worker = Arc::new(DeliveryWorker::new(
        store.clone(),
        transport,
        config.mailer.clone(),
        shutdown.clone(),
    ));

    let dispatcher = Dispatcher::new(
        store.clone(),
        worker.clone(),
        &config.mailer,
        shutdown.clone(),
    );

    let scheduler = config.mailer.scheduler_enabled.then(|| {
        Scheduler::spawn(
            store.clone(),
            worker.clone(),
            config.mailer.clone(),
            shutdown.clone(),
        )
    });

    info!("mailerd running, ctrl-c to stop");
    tokio::signal::ctrl_c().await.ok();
    info!("shutting down");

    shutdown.cancel();
    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await;
    }
    dispatcher.shutdown().await;

    Ok(())
}

async fn cmd_send(to: String, subject: String, body: String, wait: bool) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let store: Arc<dyn TaskStore> = Arc::new(connect(&config).await?);

    if wait {
        let transport: Arc<dyn Transport> =
            Arc::new(SmtpMailer::new(&config.smtp, &config.mailer)?);
        let shutdown = CancellationToken::new();
        let worker = Arc::new(DeliveryWorker::new(
            store.clone(),
            transport,
            config.mailer.clone(),
            shutdown.clone(),
        ));
        let dispatcher = Dispatcher::new(store.clone(), worker, &config.mailer, shutdown);
        let id = dispatcher.send_sync(&to, &subject, &body).await?;
        let task = store.get(id).await?;
        match task {
            Some(task) => println!("{} -> {}", id, task.status),
            None => println!("{id} -> unknown"),
        }
        dispatcher.shutdown().await;
    } else {
        let task = store.enqueue(&to, &subject, &body).await?;
        println!("Queued: {}", task.id);
    }

    Ok(())
}

async fn cmd_task_list(
    store: &PgTaskStore,
    status: Option<String>,
    limit: i64,
) -> anyhow::Result<()> {
    let status_filter: Option<TaskStatus> = status
        .map(|s| {
            s.parse()
                .map_err(|_| anyhow::anyhow!("invalid status: {s}"))
        })
        .transpose()?;

    let tasks = store.list_recent(status_filter, limit).await?;

    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<10}  {:<3}  {:<30}  CREATED",
        "ID", "STATUS", "ATT", "RECIPIENT"
    );
    println!("{}", "-".repeat(100));

    for task in &tasks {
        // Char-based: byte slicing would panic on multibyte recipients.
        let recipient = truncate_chars(&task.recipient, 30);
        println!(
            "{:<36}  {:<10}  {:<3}  {:<30}  {}",
            task.id,
            task.status,
            task.attempts,
            recipient,
            task.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    println!("\n{} task(s)", tasks.len());
    Ok(())
}

async fn cmd_task_show(store: &PgTaskStore, id_str: String, json: bool) -> anyhow::Result<()> {
    let id = TaskId(uuid::Uuid::parse_str(&id_str)?);

    let Some(task) = store.get(id).await? else {
        anyhow::bail!("no task with id {id_str}");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
        return Ok(());
    }

    println!("ID:         {}", task.id);
    println!("Recipient:  {}", task.recipient);
    println!("Subject:    {}", task.subject);
    println!("Status:     {}", task.status);
    println!("Attempts:   {}", task.attempts);
    println!("Hash:       {}", task.content_hash);
    println!("Created:    {}", task.created_at);
    println!("Updated:    {}", task.updated_at);
    if let Some(sent) = task.sent_at {
        println!("Sent:       {sent}");
    }
    if let Some(ref err) = task.last_error {
        println!("Last Error: {err}");
    }

    Ok(())
}
