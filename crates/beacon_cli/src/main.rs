//! `beacon` command-line front end.
//!
//! # Responsibility
//! - Map subcommands onto `beacon_core` services over one SQLite file.
//! - Keep output line-oriented so it can be piped and grepped.
//!
//! Tasks are addressed by their `N.M` display id inside `--project`.

use beacon_core::db::open_db;
use beacon_core::{
    init_logging_from_config, CoreConfig, LinkOutcome, NewTask, ProjectDetails, ProjectId,
    ProjectKind, ProjectService, PropagationSummary, ScheduleService, SqliteProjectRepository,
    SqliteScheduleRepository, TaskId, TaskStatus,
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};
use rusqlite::Connection;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "beacon", version, about = "Project planning and dependency scheduling")]
struct Cli {
    /// SQLite database file; overrides BEACON_DB_PATH.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Absolute log directory; overrides BEACON_LOG_DIR.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },
    Activity {
        #[command(subcommand)]
        command: ActivityCommand,
    },
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Re-run date propagation over a project.
    Propagate {
        #[arg(long)]
        project: ProjectId,
    },
    /// Print every active task of a project ordered by display id.
    Board {
        #[arg(long)]
        project: ProjectId,
    },
    /// Print the task uuid behind a display id.
    Resolve {
        #[arg(long)]
        project: ProjectId,
        display_id: String,
    },
}

#[derive(Subcommand)]
enum ProjectCommand {
    Create {
        #[arg(long, value_enum)]
        kind: KindArg,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        owner: Option<String>,
    },
    List {
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
    },
}

#[derive(Subcommand)]
enum ActivityCommand {
    Add {
        #[arg(long)]
        project: ProjectId,
        #[arg(long)]
        name: String,
        /// Parent activity uuid for a sub-activity.
        #[arg(long)]
        parent: Option<Uuid>,
    },
}

#[derive(Subcommand)]
enum TaskCommand {
    Add {
        #[arg(long)]
        project: ProjectId,
        /// Owning activity uuid.
        #[arg(long)]
        activity: Uuid,
        #[arg(long)]
        name: String,
        /// Start date as YYYY-MM-DD.
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long, default_value_t = 1)]
        duration: u32,
    },
    /// Replace predecessors and/or successors from comma-separated ids.
    Link {
        #[arg(long)]
        project: ProjectId,
        #[arg(long)]
        task: String,
        /// Tasks that must finish first, e.g. `1.1,2.3`.
        #[arg(long, value_delimiter = ',')]
        after: Option<Vec<String>>,
        /// Tasks that wait on this one.
        #[arg(long, value_delimiter = ',')]
        before: Option<Vec<String>>,
    },
    Status {
        #[arg(long)]
        project: ProjectId,
        #[arg(long)]
        task: String,
        #[arg(long, value_enum)]
        status: StatusArg,
    },
    Reschedule {
        #[arg(long)]
        project: ProjectId,
        #[arg(long)]
        task: String,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        duration: u32,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Physical,
    Inventive,
    Community,
    Legislative,
}

impl From<KindArg> for ProjectKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Physical => Self::Physical,
            KindArg::Inventive => Self::Inventive,
            KindArg::Community => Self::Community,
            KindArg::Legislative => Self::Legislative,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatusArg {
    NotStarted,
    InProgress,
    Complete,
    OnHold,
}

impl From<StatusArg> for TaskStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::NotStarted => Self::NotStarted,
            StatusArg::InProgress => Self::InProgress,
            StatusArg::Complete => Self::Complete,
            StatusArg::OnHold => Self::OnHold,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let mut config = CoreConfig::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(log_dir) = cli.log_dir {
        config.log_dir = Some(log_dir);
    }
    init_logging_from_config(&config)?;

    let conn = open_db(&config.db_path)?;
    info!(
        "event=cli_command module=cli status=start db_path={}",
        config.db_path.display()
    );

    match cli.command {
        Commands::Project { command } => run_project(&conn, command),
        Commands::Activity { command } => run_activity(&conn, command),
        Commands::Task { command } => run_task(&conn, command),
        Commands::Propagate { project } => {
            let summary = schedule_service(&conn)?.propagate(project)?;
            print_propagation(&summary);
            Ok(())
        }
        Commands::Board { project } => print_board(&conn, project),
        Commands::Resolve {
            project,
            display_id,
        } => {
            let task_uuid = resolve_task(&schedule_service(&conn)?, project, &display_id)?;
            println!("{task_uuid}");
            Ok(())
        }
    }
}

fn run_project(conn: &Connection, command: ProjectCommand) -> CliResult<()> {
    let service = ProjectService::new(SqliteProjectRepository::try_new(conn)?);
    match command {
        ProjectCommand::Create {
            kind,
            title,
            description,
            owner,
        } => {
            let project = service.create_project(
                kind.into(),
                title,
                ProjectDetails { description, owner },
            )?;
            println!("{}", project.uuid);
        }
        ProjectCommand::List { kind } => {
            for project in service.list_projects(kind.map(Into::into))? {
                println!("{}\t{}\t{}", project.uuid, project.kind.as_str(), project.title);
            }
        }
    }
    Ok(())
}

fn run_activity(conn: &Connection, command: ActivityCommand) -> CliResult<()> {
    let service = schedule_service(conn)?;
    match command {
        ActivityCommand::Add {
            project,
            name,
            parent,
        } => {
            let activity = service.add_activity(project, parent, name)?;
            println!("{}\t{}", activity.number, activity.uuid);
        }
    }
    Ok(())
}

fn run_task(conn: &Connection, command: TaskCommand) -> CliResult<()> {
    let service = schedule_service(conn)?;
    match command {
        TaskCommand::Add {
            project,
            activity,
            name,
            start,
            duration,
        } => {
            let mut new_task = NewTask::new(project, activity, name);
            new_task.start_date = start;
            new_task.duration_days = duration;
            let task = service.add_task(new_task)?;
            println!("{}\t{}", service.display_id(task.uuid)?, task.uuid);
        }
        TaskCommand::Link {
            project,
            task,
            after,
            before,
        } => {
            if after.is_none() && before.is_none() {
                return Err("pass --after and/or --before".into());
            }
            let task_uuid = resolve_task(&service, project, &task)?;
            link_task(&service, task_uuid, after, before)?;
        }
        TaskCommand::Status {
            project,
            task,
            status,
        } => {
            let task_uuid = resolve_task(&service, project, &task)?;
            let updated = service.update_task_status(task_uuid, status.into())?;
            println!("{task}\t{}", updated.status.as_str());
        }
        TaskCommand::Reschedule {
            project,
            task,
            start,
            duration,
        } => {
            let task_uuid = resolve_task(&service, project, &task)?;
            let summary = service.reschedule_task(task_uuid, start, duration)?;
            print_propagation(&summary);
        }
    }
    Ok(())
}

fn print_board(conn: &Connection, project: ProjectId) -> CliResult<()> {
    for entry in schedule_service(conn)?.task_board(project)? {
        let predecessors: Vec<String> = entry
            .predecessor_ids
            .iter()
            .map(ToString::to_string)
            .collect();
        println!(
            "{}\t{}\t{}\t{}d\t{}\t{}\tafter={}",
            entry.display_id,
            format_date(entry.task.start_date),
            format_date(entry.task.finish_date),
            entry.task.duration_days,
            entry.task.status.as_str(),
            entry.task.name,
            predecessors.join(",")
        );
    }
    Ok(())
}

/// Applies `--after` then `--before`; the second is skipped when the first fails.
fn link_task(
    service: &ScheduleService<SqliteScheduleRepository<'_>>,
    task_uuid: TaskId,
    after: Option<Vec<String>>,
    before: Option<Vec<String>>,
) -> CliResult<()> {
    if let Some(ids) = after {
        print_link("after", &service.set_predecessors(task_uuid, ids.as_slice())?);
    }
    if let Some(ids) = before {
        print_link("before", &service.set_successors(task_uuid, ids.as_slice())?);
    }
    Ok(())
}

fn print_link(label: &str, outcome: &LinkOutcome) {
    println!("{label}: linked {}", outcome.linked.len());
    for typed in &outcome.unresolved {
        eprintln!("warning: no task matches `{typed}`");
    }
    print_propagation(&outcome.propagation);
}

fn print_propagation(summary: &PropagationSummary) {
    println!("moved {} task(s)", summary.changed.len());
    if !summary.excluded_display_ids.is_empty() {
        let ids: Vec<String> = summary
            .excluded_display_ids
            .iter()
            .map(ToString::to_string)
            .collect();
        eprintln!("warning: dependency cycle, skipped {}", ids.join(","));
    }
}

fn schedule_service(conn: &Connection) -> CliResult<ScheduleService<SqliteScheduleRepository<'_>>> {
    Ok(ScheduleService::new(SqliteScheduleRepository::try_new(conn)?))
}

fn resolve_task(
    service: &ScheduleService<SqliteScheduleRepository<'_>>,
    project: ProjectId,
    typed: &str,
) -> CliResult<TaskId> {
    service
        .resolve(project, typed)?
        .ok_or_else(|| format!("no task `{typed}` in project {project}").into())
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "-".to_string(), |date| date.to_string())
}
