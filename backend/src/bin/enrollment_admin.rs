//! Operator CLI for enrollment admission control.
//!
//! Applies migrations and drives the enrollment coordinator from batch jobs
//! or a shell. Results are printed as JSON; domain failures are printed as the
//! serialized error and mapped to distinct exit codes.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::env;
use std::ffi::OsString;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Result, WrapErr, eyre};
use ortho_config::OrthoConfig;
use serde_json::{Value, json};
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use facility_backend::domain::ports::{EnrollmentCommand, EnrollmentQuery};
use facility_backend::domain::{
    CustomerId, DomainResult, EnrollmentCoordinator, EnrollmentFilter, EnrollmentId,
    EnrollmentQueryService, EnrollmentStatus, ErrorCode, EventId, Occupancy, ProgramId,
    ResourceId,
};
use facility_backend::outbound::persistence::{
    DbPool, DieselEnrollmentRecordStore, DieselEnrollmentStore, run_migrations,
};
use facility_backend::settings::EnrollmentSettings;

/// `enrollment-admin` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "enrollment-admin",
    about = "Enroll customers into capacity-bound events and programs",
    version
)]
struct CliArgs {
    /// Database connection URL. Falls back to `ENROLLMENT_DATABASE_URL`, then
    /// `DATABASE_URL`.
    #[arg(long = "database-url", value_name = "url", global = true)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Apply pending schema migrations.
    Migrate,
    /// Enroll a customer into one event.
    EnrollEvent {
        #[arg(long)]
        customer: CustomerId,
        #[arg(long)]
        event: EventId,
    },
    /// Enroll a customer into every event of a program.
    EnrollProgram {
        #[arg(long)]
        customer: CustomerId,
        #[arg(long)]
        program: ProgramId,
    },
    /// Cancel a customer's enrollment in an event or program.
    UnEnroll {
        #[arg(long)]
        customer: CustomerId,
        #[command(flatten)]
        resource: ResourceArgs,
    },
    /// Record a customer's attendance at an event.
    CheckIn {
        #[arg(long)]
        customer: CustomerId,
        #[arg(long)]
        event: EventId,
    },
    /// Report whether an event or program is full and how many seats remain.
    IsFull {
        #[command(flatten)]
        resource: ResourceArgs,
    },
    /// List enrollments, or show one by id.
    List {
        #[arg(long, conflicts_with_all = ["event", "program", "customer"])]
        id: Option<EnrollmentId>,
        #[arg(long, conflicts_with = "program")]
        event: Option<EventId>,
        #[arg(long)]
        program: Option<ProgramId>,
        #[arg(long)]
        customer: Option<CustomerId>,
        #[arg(long, value_enum, default_value_t = StatusArg::Active)]
        status: StatusArg,
    },
}

#[derive(Debug, Clone, clap::Args)]
#[group(required = true, multiple = false)]
struct ResourceArgs {
    #[arg(long)]
    event: Option<EventId>,
    #[arg(long)]
    program: Option<ProgramId>,
}

impl ResourceArgs {
    fn resource(&self) -> Result<ResourceId> {
        match (self.event, self.program) {
            (Some(event), None) => Ok(event.into()),
            (None, Some(program)) => Ok(program.into()),
            _ => Err(eyre!("exactly one of --event or --program is required")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StatusArg {
    Active,
    Cancelled,
    All,
}

impl From<StatusArg> for EnrollmentStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Active => Self::Active,
            StatusArg::Cancelled => Self::Cancelled,
            StatusArg::All => Self::All,
        }
    }
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(std::io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = CliArgs::parse();
    let settings = EnrollmentSettings::load_from_iter([OsString::from("enrollment-admin")])
        .map_err(|error| eyre!("load enrollment settings: {error}"))?;
    let database_url = resolve_database_url(args.database_url.clone(), &settings)?;

    if matches!(args.command, Command::Migrate) {
        let applied = run_migrations(&database_url).wrap_err("apply migrations")?;
        println!("{}", json!({ "applied": applied }));
        return Ok(ExitCode::SUCCESS);
    }

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("create Tokio runtime")?;
    runtime.block_on(async_main(args.command, settings, database_url))
}

async fn async_main(
    command: Command,
    settings: EnrollmentSettings,
    database_url: String,
) -> Result<ExitCode> {
    let pool = DbPool::new(settings.pool_config(database_url))
        .await
        .wrap_err("create database pool")?;

    let mut coordinator =
        EnrollmentCoordinator::new(Arc::new(DieselEnrollmentStore::new(pool.clone())));
    if let Some(timeout) = settings.attempt_timeout() {
        coordinator = coordinator.with_attempt_timeout(timeout);
    }
    let query = EnrollmentQueryService::new(Arc::new(DieselEnrollmentRecordStore::new(pool)));

    match dispatch(command, &coordinator, &query).await? {
        Ok(value) => {
            println!("{value}");
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            println!("{}", serde_json::to_string(&error)?);
            Ok(exit_code_for(error.code()))
        }
    }
}

async fn dispatch<C, Q>(
    command: Command,
    coordinator: &C,
    query: &Q,
) -> Result<DomainResult<Value>>
where
    C: EnrollmentCommand,
    Q: EnrollmentQuery,
{
    let outcome = match command {
        Command::Migrate => return Err(eyre!("migrations run before the runtime starts")),
        Command::EnrollEvent { customer, event } => {
            to_json(coordinator.enroll_in_event(customer, event).await)?
        }
        Command::EnrollProgram { customer, program } => {
            to_json(coordinator.enroll_in_program(customer, program).await)?
        }
        Command::UnEnroll { customer, resource } => coordinator
            .un_enroll(customer, resource.resource()?)
            .await
            .map(|()| json!({ "cancelled": true })),
        Command::CheckIn { customer, event } => {
            to_json(coordinator.check_in(customer, event).await)?
        }
        Command::IsFull { resource } => {
            let resource = resource.resource()?;
            coordinator
                .occupancy(resource)
                .await
                .map(|occupancy| capacity_report(resource, occupancy))
        }
        Command::List {
            id: Some(id), ..
        } => to_json(query.get_enrollment(id).await)?,
        Command::List {
            id: None,
            event,
            program,
            customer,
            status,
        } => {
            let mut filter = EnrollmentFilter::default().with_status(status.into());
            if let Some(event) = event {
                filter = filter.for_resource(event);
            }
            if let Some(program) = program {
                filter = filter.for_resource(program);
            }
            if let Some(customer) = customer {
                filter = filter.for_customer(customer);
            }
            to_json(query.list_enrollments(filter).await)?
        }
    };
    Ok(outcome)
}

/// Seat summary printed by `is-full`; `remaining` is `null` when unlimited.
fn capacity_report(resource: ResourceId, occupancy: Occupancy) -> Value {
    json!({
        "resource": resource,
        "full": occupancy.is_full(),
        "remaining": occupancy.remaining(),
    })
}

fn to_json<T: serde::Serialize>(outcome: DomainResult<T>) -> Result<DomainResult<Value>> {
    match outcome {
        Ok(value) => Ok(Ok(serde_json::to_value(value)?)),
        Err(error) => Ok(Err(error)),
    }
}

fn exit_code_for(code: ErrorCode) -> ExitCode {
    match code {
        ErrorCode::Conflict => ExitCode::from(3),
        ErrorCode::NotFound => ExitCode::from(4),
        ErrorCode::InternalError => ExitCode::FAILURE,
    }
}

fn resolve_database_url(explicit: Option<String>, settings: &EnrollmentSettings) -> Result<String> {
    let candidate = explicit
        .or_else(|| settings.database_url().map(str::to_owned))
        .or_else(|| env::var("DATABASE_URL").ok())
        .ok_or_else(|| {
            eyre!("database URL missing: set --database-url, ENROLLMENT_DATABASE_URL, or DATABASE_URL")
        })?;
    if candidate.trim().is_empty() {
        return Err(eyre!("database URL must not be empty"));
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    //! Unit tests for CLI parsing helpers.

    use rstest::rstest;

    use super::*;

    fn empty_settings() -> EnrollmentSettings {
        EnrollmentSettings {
            database_url: None,
            pool_max_size: None,
            pool_min_idle: None,
            connection_timeout_secs: None,
            attempt_timeout_ms: None,
        }
    }

    #[rstest]
    fn explicit_database_url_wins() {
        let mut settings = empty_settings();
        settings.database_url = Some("postgres://settings/db".to_owned());

        let url = resolve_database_url(Some("postgres://flag/db".to_owned()), &settings)
            .expect("url resolves");
        assert_eq!(url, "postgres://flag/db");
    }

    #[rstest]
    fn settings_database_url_is_used_without_flag() {
        let mut settings = empty_settings();
        settings.database_url = Some("postgres://settings/db".to_owned());

        let url = resolve_database_url(None, &settings).expect("url resolves");
        assert_eq!(url, "postgres://settings/db");
    }

    #[rstest]
    fn blank_database_url_is_rejected() {
        let error = resolve_database_url(Some("   ".to_owned()), &empty_settings())
            .expect_err("blank url rejected");
        assert!(error.to_string().contains("must not be empty"));
    }

    #[rstest]
    fn un_enroll_requires_exactly_one_resource() {
        let customer = CustomerId::random().to_string();
        let result = CliArgs::try_parse_from([
            "enrollment-admin",
            "un-enroll",
            "--customer",
            customer.as_str(),
        ]);
        assert!(result.is_err());
    }

    #[rstest]
    fn is_full_parses_program_identifiers() {
        let program = ProgramId::random();
        let program_arg = program.to_string();
        let args = CliArgs::try_parse_from([
            "enrollment-admin",
            "is-full",
            "--program",
            program_arg.as_str(),
        ])
        .expect("arguments parse");

        match args.command {
            Command::IsFull { resource } => {
                assert_eq!(
                    resource.resource().expect("resource resolves"),
                    ResourceId::Program(program)
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[rstest]
    #[case(Occupancy::new(Some(3), 1), false, json!(2))]
    #[case(Occupancy::new(Some(2), 2), true, json!(0))]
    #[case(Occupancy::new(None, 40), false, Value::Null)]
    fn capacity_report_includes_remaining_seats(
        #[case] occupancy: Occupancy,
        #[case] full: bool,
        #[case] remaining: Value,
    ) {
        let report = capacity_report(ResourceId::Event(EventId::random()), occupancy);
        assert_eq!(report["full"], json!(full));
        assert_eq!(report["remaining"], remaining);
    }

    #[rstest]
    #[case(ErrorCode::Conflict, ExitCode::from(3))]
    #[case(ErrorCode::NotFound, ExitCode::from(4))]
    #[case(ErrorCode::InternalError, ExitCode::FAILURE)]
    fn exit_codes_follow_error_codes(#[case] code: ErrorCode, #[case] expected: ExitCode) {
        assert_eq!(exit_code_for(code), expected);
    }
}
