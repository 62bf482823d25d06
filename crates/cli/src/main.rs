// Windlass CLI
//
// Design Decision: clap derive for argument parsing, one subcommand per
// role, mirroring the service-side split between activity and decision
// pollers.
// Design Decision: the hosted service transport lives outside this
// workspace; subcommands wire the in-memory backend, which is what
// local runs and the test suites use.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use windlass_core::client::memory::{InMemoryObjectStore, InMemoryWorkflowService};
use windlass_core::client::register_plan;
use windlass_core::{Config, UidMinter, UuidMinter, WorkflowService};
use windlass_worker::{
    Actor, ActorConfig, Decider, DeciderConfig, WorkerPool, WorkspaceOptions,
};

#[derive(Parser)]
#[command(name = "windlass")]
#[command(about = "Actor and decider workers for a hosted workflow service")]
#[command(version)]
struct Cli {
    /// Configuration file (YAML, or JSON with a .json extension)
    #[arg(long, env = "WINDLASS_CONFIG", global = true, default_value = "windlass.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run activity workers that execute a command per task
    Actor {
        /// Activity queue to poll
        #[arg(long)]
        queue: String,

        /// The command to run for each task
        #[arg(long)]
        command: String,

        /// Number of concurrent workers
        #[arg(long, default_value = "1")]
        workers: usize,

        /// Stop cleanly when this path exists
        #[arg(long)]
        quiesce: Option<PathBuf>,

        /// Do not replicate the invoking directory into workspaces
        #[arg(long)]
        nocopy: bool,

        /// Root workspaces under the invoking directory, for debugging
        #[arg(long)]
        local: bool,

        /// Store artifacts uncompressed
        #[arg(long)]
        gzipless: bool,
    },

    /// Run decision workers that advance workflows through the plan
    Decider {
        /// Decision queue to poll
        #[arg(long)]
        queue: String,

        /// Number of concurrent workers
        #[arg(long, default_value = "1")]
        workers: usize,

        /// Stop cleanly when this path exists
        #[arg(long)]
        quiesce: Option<PathBuf>,
    },

    /// Start a new workflow execution of the configured plan
    Start {
        /// Input metadata for the execution
        #[arg(long)]
        input: Option<String>,
    },

    /// Register the domain and every type the plan references
    Register,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "windlass=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    info!(
        domain = %config.domain,
        bucket = %config.bucket,
        prefix = %config.prefix,
        "configuration loaded"
    );

    let service = Arc::new(InMemoryWorkflowService::new());
    let store = Arc::new(InMemoryObjectStore::new());

    match cli.command {
        Commands::Actor {
            queue,
            command,
            workers,
            quiesce,
            nocopy,
            local,
            gzipless,
        } => {
            register_plan(service.as_ref(), &config.plan).await?;

            let mut actor_config = ActorConfig::new(queue, command);
            actor_config.quiesce = quiesce;
            actor_config.workspace = WorkspaceOptions { nocopy, local };
            actor_config.gzip = !gzipless;
            let actor = Arc::new(Actor::new(service, store, actor_config));

            let pool = WorkerPool::spawn(workers, |_| {
                let actor = actor.clone();
                async move { actor.run().await }
            });

            tokio::select! {
                _ = pool.join() => info!("all actor workers quiesced"),
                _ = tokio::signal::ctrl_c() => info!("interrupt received, shutting down"),
            }
        }

        Commands::Decider {
            queue,
            workers,
            quiesce,
        } => {
            register_plan(service.as_ref(), &config.plan).await?;

            let mut decider_config = DeciderConfig::new(queue);
            decider_config.quiesce = quiesce;
            let uids: Arc<dyn UidMinter> = Arc::new(UuidMinter);
            let decider = Arc::new(Decider::new(
                service,
                config.plan.clone(),
                uids,
                decider_config,
            ));

            let pool = WorkerPool::spawn(workers, |_| {
                let decider = decider.clone();
                async move { decider.run().await }
            });

            tokio::select! {
                _ = pool.join() => info!("all decider workers quiesced"),
                _ = tokio::signal::ctrl_c() => info!("interrupt received, shutting down"),
            }
        }

        Commands::Start { input } => {
            register_plan(service.as_ref(), &config.plan).await?;

            let uid = UuidMinter.mint();
            let start = &config.plan.start;
            service
                .start_workflow(&uid, &start.name, &start.version, &start.queue, input)
                .await?;
            println!("{uid}");
        }

        Commands::Register => {
            register_plan(service.as_ref(), &config.plan).await?;
            info!("registration complete");
        }
    }

    Ok(())
}
