use std::collections::BTreeMap;

use admissions_ai::analytics::Selector;
use admissions_ai::config::AppConfig;
use admissions_ai::domain::{ApplicationStatus, Milestone, StudentProfile};
use admissions_ai::error::AppError;
use admissions_ai::store::fetch_all;
use admissions_ai::workflows::performance::performance_metrics;
use admissions_ai::workflows::{
    CrmService, MilestoneUpdate, ReportFilters, ReportFormat, ReportOutput, ReportRequest,
    TransitionRequest, WorkflowError,
};
use chrono::NaiveDate;
use clap::{Args, ValueEnum};

use crate::infra::build_service;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub(crate) format: OutputFormat,
    /// Report title (defaults to "Custom Report")
    #[arg(long)]
    pub(crate) title: Option<String>,
    /// Only applications in this status, e.g. `offer`
    #[arg(long)]
    pub(crate) status: Option<String>,
    /// Only applications to universities in this country
    #[arg(long)]
    pub(crate) country: Option<String>,
    /// Only applications handled by this counselor
    #[arg(long)]
    pub(crate) counselor: Option<String>,
    /// Earliest creation date (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) date_from: Option<NaiveDate>,
    /// Latest creation date (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) date_to: Option<NaiveDate>,
    /// Ask the reasoner for highlights, risks and recommendations
    #[arg(long)]
    pub(crate) insights: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the steps that call the reasoner even when one is configured.
    #[arg(long)]
    pub(crate) skip_reasoning: bool,
}

fn selector(value: Option<String>) -> Selector<String> {
    value.map_or(Selector::All, Selector::Only)
}

pub(crate) fn report_request(args: ReportArgs) -> ReportRequest {
    ReportRequest {
        title: args.title,
        filters: ReportFilters {
            status: selector(args.status),
            country: selector(args.country),
            counselor_id: selector(args.counselor),
            date_from: args.date_from,
            date_to: args.date_to,
        },
        format: match args.format {
            OutputFormat::Json => ReportFormat::Json,
            OutputFormat::Csv => ReportFormat::Csv,
        },
        include_insights: args.insights,
    }
}

pub(crate) async fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = build_service(&config)?;

    match service.generate_report(report_request(args)).await? {
        ReportOutput::Json(report) => println!("{}", serde_json::to_string_pretty(&report)?),
        ReportOutput::Csv(csv) => print!("{csv}"),
    }
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = build_service(&config)?;
    let limit = config.store.fetch_limit;
    let store = service.store();

    println!("Admissions CRM demo");

    let students = fetch_all(store.students.as_ref(), limit).map_err(WorkflowError::from)?;
    let applications =
        fetch_all(store.applications.as_ref(), limit).map_err(WorkflowError::from)?;
    let communications =
        fetch_all(store.communications.as_ref(), limit).map_err(WorkflowError::from)?;

    println!("\nCounselor performance");
    let mut caseloads: BTreeMap<String, Vec<StudentProfile>> = BTreeMap::new();
    for student in &students {
        if let Some(counselor) = &student.counselor_id {
            caseloads
                .entry(counselor.clone())
                .or_default()
                .push(student.clone());
        }
    }
    for (counselor, caseload) in &caseloads {
        let owned: Vec<_> = applications
            .iter()
            .filter(|application| application.counselor_id.as_deref() == Some(counselor.as_str()))
            .cloned()
            .collect();
        let messages: Vec<_> = communications
            .iter()
            .filter(|entry| &entry.counselor_id == counselor)
            .cloned()
            .collect();
        let metrics = performance_metrics(caseload, &owned, &messages);
        println!(
            "- {counselor}: {} students | {} applications | {:.1}% conversion | {:.1}h avg response | sentiment {:.1}",
            metrics.assigned_students,
            metrics.total_applications,
            metrics.conversion_rate,
            metrics.avg_response_time_hours,
            metrics.sentiment_score
        );
    }

    println!("\nPipeline report");
    if let ReportOutput::Json(report) = service.generate_report(ReportRequest::default()).await? {
        let summary = &report.summary;
        println!(
            "- {} applications from {} students | {:.1}% enrolled",
            summary.total_applications, summary.total_students, summary.conversion_rate
        );
        for (country, count) in &summary.applications_by_country {
            println!("  - {country}: {count}");
        }
    }

    println!("\nApplication lifecycle");
    match applications
        .iter()
        .find(|application| application.status == ApplicationStatus::Draft)
    {
        Some(draft) => walk_draft(&service, &draft.id)?,
        None => println!("- no draft application in the sample data"),
    }

    println!("\nLead scoring");
    if args.skip_reasoning || !config.reasoner.is_configured() {
        println!("- skipped (set REASONER_ENDPOINT to score leads)");
        return Ok(());
    }
    for student in &students {
        match service.score_lead(&student.id).await {
            Ok(outcome) => println!(
                "- {}: {} ({}){}",
                student.full_name,
                outcome.lead_score.score,
                outcome.lead_score.tier.label(),
                if outcome.follow_up_task.is_some() {
                    " | follow-up task opened"
                } else {
                    ""
                }
            ),
            Err(error) => println!("- {}: scoring failed ({error})", student.full_name),
        }
    }
    Ok(())
}

fn walk_draft(service: &CrmService, application_id: &str) -> Result<(), AppError> {
    let blocked = service.transition_application(
        application_id,
        TransitionRequest {
            status: ApplicationStatus::Submitted,
            note: None,
        },
    );
    if let Err(error) = blocked {
        println!("- {application_id}: {error}");
    }

    service.complete_milestone(
        application_id,
        MilestoneUpdate {
            milestone: Milestone::DocumentsSubmitted,
            date: None,
            notes: Some("Transcripts and passport received".to_string()),
        },
    )?;
    let moved = service.transition_application(
        application_id,
        TransitionRequest {
            status: ApplicationStatus::Submitted,
            note: Some("Submitted through the partner portal".to_string()),
        },
    )?;
    let next: Vec<_> = moved
        .application
        .status
        .next_statuses()
        .into_iter()
        .map(ApplicationStatus::label)
        .collect();
    println!(
        "- {application_id}: {} -> {} | next: {}",
        moved.previous_status.label(),
        moved.application.status.label(),
        next.join(", ")
    );
    Ok(())
}
