//! CLI entry point for school_metrics.
//!
//! Provides subcommands for grade, attendance, finance and review reports,
//! CSV exports, a polling dashboard and validated submissions. Records come
//! from the school API or from a local JSON snapshot.

mod telemetry;

use anyhow::{Result, bail};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use school_metrics::api::{BasicClient, BearerAuth, HttpClient, RecordFilter, Resource, SchoolApi};
use school_metrics::cache::QueryCache;
use school_metrics::config::AppConfig;
use school_metrics::metrics::periods::{monthly_invoices, monthly_payments, monthly_scores};
use school_metrics::metrics::ranking::TiePolicy;
use school_metrics::metrics::summary::{
    student_attendance, student_performance, subject_averages, summarize_attendance,
    summarize_finance, summarize_grades, summarize_reviews,
};
use school_metrics::notify::TracingNotifier;
use school_metrics::output::{append_record, export_csv, print_json};
use school_metrics::records::{
    AttendanceRecord, GradeRecord, InvoiceRecord, PaymentRecord, ReviewRecord,
};
use school_metrics::refresh::{CancellationToken, ScheduledRefresh};
use school_metrics::services::dashboard::{DashboardRow, load_dashboard};
use school_metrics::services::record_source::{RecordSource, SnapshotSource, load_records};
use school_metrics::services::submission::{
    BulkAttendance, ReviewSubmission, Submission, SubmissionOutcome, submit_and_notify,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "school_metrics")]
#[command(about = "Derived metrics and exports for school records", long_about = None)]
struct Cli {
    /// Snapshot JSON file or API base URL (defaults to SCHOOL_API_URL)
    #[arg(short, long, global = true, value_name = "FILE_OR_URL")]
    source: Option<String>,

    #[command(flatten)]
    filter: FilterArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FilterArgs {
    /// Only records for this class
    #[arg(long, global = true)]
    class: Option<String>,

    /// Only records for this student
    #[arg(long, global = true)]
    student: Option<String>,

    /// Only records for this subject
    #[arg(long, global = true)]
    subject: Option<String>,

    /// Only records for this teacher
    #[arg(long, global = true)]
    teacher: Option<String>,

    /// Earliest record date (YYYY-MM-DD)
    #[arg(long, global = true)]
    from: Option<NaiveDate>,

    /// Latest record date (YYYY-MM-DD)
    #[arg(long, global = true)]
    to: Option<NaiveDate>,
}

impl From<FilterArgs> for RecordFilter {
    fn from(args: FilterArgs) -> Self {
        RecordFilter {
            class_id: args.class,
            student_id: args.student,
            subject_id: args.subject,
            teacher_id: args.teacher,
            from: args.from,
            to: args.to,
        }
    }
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum TieArg {
    /// Equal averages keep list order: 1, 2, 3
    #[default]
    Sequential,
    /// Equal averages share a rank: 1, 1, 3
    Shared,
}

impl From<TieArg> for TiePolicy {
    fn from(arg: TieArg) -> Self {
        match arg {
            TieArg::Sequential => TiePolicy::Sequential,
            TieArg::Shared => TiePolicy::Shared,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Grade summary, subject averages and student ranking
    Grades {
        /// How students with equal averages are ranked
        #[arg(long, value_enum, default_value_t = TieArg::Sequential)]
        ties: TieArg,
    },
    /// Attendance summary with per-student absence risk
    Attendance,
    /// Invoice and payment totals with monthly series
    Finance {
        /// Date used to decide which invoices are overdue (defaults to today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Review ratings and per-teacher averages
    Reviews,
    /// Export raw records of one resource to CSV
    Export {
        /// grades, attendance, invoices, payments or reviews
        #[arg(value_name = "RESOURCE")]
        resource: Resource,

        /// CSV file to write
        #[arg(short, long)]
        output: PathBuf,

        /// Gzip compress the CSV file
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Refresh the dashboard on a schedule, appending one CSV row per sample
    Watch {
        /// Seconds between samples (defaults to REFRESH_INTERVAL_SECS)
        #[arg(short = 'r', long)]
        sample_rate: Option<u64>,

        /// Number of samples to collect (0 = until Ctrl+C)
        #[arg(short = 'n', long, default_value_t = 0)]
        num_samples: usize,

        /// CSV file to append samples to
        #[arg(short, long, default_value = "dashboard.csv")]
        output: String,
    },
    /// Submit a teacher review
    SubmitReview {
        teacher_id: String,
        subject_id: String,
        /// 1 to 5
        rating: u8,
        comment: String,
    },
    /// Submit attendance for a class from a JSON file
    MarkAttendance {
        /// JSON file with classId, date and entries
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let cli = Cli::parse();

    let config = AppConfig::from_env()?;
    let _log_guard = telemetry::init(&config.log_file_path)?;

    let filter = RecordFilter::from(cli.filter);
    let source = cli.source;

    match cli.command {
        Commands::Grades { ties } => {
            let records = open_source(source.as_deref(), &config)?;
            let grades: Vec<GradeRecord> =
                load_records(records.as_ref(), Resource::Grades, &filter).await?;

            print_json(&json!({
                "summary": summarize_grades(&grades),
                "subjects": subject_averages(&grades),
                "students": student_performance(&grades, ties.into()),
                "monthly": monthly_scores(&grades),
            }))?;
        }
        Commands::Attendance => {
            let records = open_source(source.as_deref(), &config)?;
            let attendance: Vec<AttendanceRecord> =
                load_records(records.as_ref(), Resource::Attendance, &filter).await?;

            print_json(&json!({
                "summary": summarize_attendance(&attendance),
                "students": student_attendance(&attendance),
            }))?;
        }
        Commands::Finance { as_of } => {
            let records = open_source(source.as_deref(), &config)?;
            let (invoices, payments) = tokio::try_join!(
                load_records::<InvoiceRecord>(records.as_ref(), Resource::Invoices, &filter),
                load_records::<PaymentRecord>(records.as_ref(), Resource::Payments, &filter),
            )?;
            let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());

            print_json(&json!({
                "summary": summarize_finance(&invoices, &payments, as_of),
                "monthlyInvoices": monthly_invoices(&invoices),
                "monthlyPayments": monthly_payments(&payments),
            }))?;
        }
        Commands::Reviews => {
            let records = open_source(source.as_deref(), &config)?;
            let reviews: Vec<ReviewRecord> =
                load_records(records.as_ref(), Resource::Reviews, &filter).await?;

            print_json(&summarize_reviews(&reviews))?;
        }
        Commands::Export {
            resource,
            output,
            gzip,
        } => {
            let records = open_source(source.as_deref(), &config)?;
            export_resource(records.as_ref(), resource, &filter, &output, gzip).await?;
        }
        Commands::Watch {
            sample_rate,
            num_samples,
            output,
        } => {
            let records = open_source(source.as_deref(), &config)?;
            let period = sample_rate
                .map(Duration::from_secs)
                .unwrap_or(config.refresh_interval);
            watch_dashboard(records, filter, period, num_samples, output).await?;
        }
        Commands::SubmitReview {
            teacher_id,
            subject_id,
            rating,
            comment,
        } => {
            let submission = Submission::Review(ReviewSubmission {
                teacher_id,
                subject_id,
                rating,
                comment,
            });
            submit(source.as_deref(), &config, &submission).await?;
        }
        Commands::MarkAttendance { file } => {
            let content = std::fs::read_to_string(&file)?;
            let attendance: BulkAttendance = serde_json::from_str(&content)?;
            submit(source.as_deref(), &config, &Submission::Attendance(attendance)).await?;
        }
    }

    Ok(())
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn build_api(base_url: &str, config: &AppConfig) -> Result<SchoolApi<Box<dyn HttpClient>>> {
    let basic = BasicClient::new(config.request_timeout)?;
    let client: Box<dyn HttpClient> = match &config.api_token {
        Some(token) => Box::new(BearerAuth::new(basic, token)?),
        None => Box::new(basic),
    };
    Ok(SchoolApi::new(client, base_url)?)
}

/// Opens a snapshot file, or the API at the given (or configured) URL.
fn open_source(source: Option<&str>, config: &AppConfig) -> Result<Arc<dyn RecordSource>> {
    match source {
        Some(path) if !is_url(path) => {
            info!(path, "Reading records from snapshot");
            Ok(Arc::new(SnapshotSource::load(path)?))
        }
        Some(url) => Ok(Arc::new(build_api(url, config)?)),
        None => Ok(Arc::new(build_api(&config.api_base_url, config)?)),
    }
}

#[tracing::instrument(skip(source, filter), fields(resource = %resource, output = %output.display()))]
async fn export_resource(
    source: &dyn RecordSource,
    resource: Resource,
    filter: &RecordFilter,
    output: &Path,
    gzip: bool,
) -> Result<()> {
    let rows = match resource {
        Resource::Grades => {
            let records: Vec<GradeRecord> = load_records(source, resource, filter).await?;
            export_csv(output, &records, gzip)?
        }
        Resource::Attendance => {
            let records: Vec<AttendanceRecord> = load_records(source, resource, filter).await?;
            export_csv(output, &records, gzip)?
        }
        Resource::Invoices => {
            let records: Vec<InvoiceRecord> = load_records(source, resource, filter).await?;
            export_csv(output, &records, gzip)?
        }
        Resource::Payments => {
            let records: Vec<PaymentRecord> = load_records(source, resource, filter).await?;
            export_csv(output, &records, gzip)?
        }
        Resource::Reviews => {
            let records: Vec<ReviewRecord> = load_records(source, resource, filter).await?;
            export_csv(output, &records, gzip)?
        }
    };

    if rows == 0 {
        info!("No records matched; wrote an empty file");
    }
    Ok(())
}

/// Samples the dashboard every `period`, appending a row per sample.
#[tracing::instrument(skip(source, filter, period), fields(period_secs = period.as_secs()))]
async fn watch_dashboard(
    source: Arc<dyn RecordSource>,
    filter: RecordFilter,
    period: Duration,
    num_samples: usize,
    output: String,
) -> Result<()> {
    let cache = Arc::new(QueryCache::new());
    let token = CancellationToken::new();

    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received, stopping");
            ctrl_c.cancel();
        }
    });

    let mut schedule = ScheduledRefresh::every(period);
    if num_samples == 0 {
        info!("Sampling until Ctrl+C");
    } else {
        schedule = schedule.with_max_ticks(num_samples);
        info!(num_samples, "Starting sample collection");
    }

    let filter = Arc::new(filter);
    let output = Arc::new(output);

    let ticks = schedule
        .run(token, |sample| {
            let source = Arc::clone(&source);
            let cache = Arc::clone(&cache);
            let filter = Arc::clone(&filter);
            let output = Arc::clone(&output);
            async move {
                let as_of = Utc::now().date_naive();
                // A zero max_age sends every sample to the source.
                match load_dashboard(source.as_ref(), &cache, &filter, Duration::ZERO, as_of).await {
                    Ok(snapshot) => {
                        append_record(&output, &snapshot.to_row())?;
                        info!(
                            sample,
                            average_score = snapshot.grades.average,
                            attendance_rate = snapshot.attendance.attendance_rate,
                            outstanding = snapshot.finance.total_outstanding,
                            "Dashboard sample recorded"
                        );
                    }
                    Err(e) => {
                        error!(sample, error = %e, "Dashboard refresh failed");
                        append_record(&output, &DashboardRow::from_error("fetch_error", &e.to_string()))?;
                    }
                }
                Ok::<(), anyhow::Error>(())
            }
        })
        .await;

    info!(samples = ticks, output = %output, "Finished sampling");
    Ok(())
}

async fn submit(source: Option<&str>, config: &AppConfig, submission: &Submission) -> Result<()> {
    let base_url = match source {
        Some(path) if !is_url(path) => bail!("submissions need an API source, got file '{path}'"),
        Some(url) => url,
        None => config.api_base_url.as_str(),
    };
    let api = build_api(base_url, config)?;
    let cache = QueryCache::new();

    match submit_and_notify(&api, &TracingNotifier, &cache, submission).await {
        SubmissionOutcome::Accepted => Ok(()),
        SubmissionOutcome::Rejected { field, message } => bail!("invalid {field}: {message}"),
        SubmissionOutcome::Failed { message, retryable } => {
            if retryable {
                bail!("{message} (temporary failure, try again)")
            }
            bail!("{message}")
        }
    }
}
