use anyhow::Result;
use boxtrack_core::{ActivityStatus, MemberId};
use boxtrack_engine::{
    standard_catalog, InspectionGate, MaterialLedger, ProgressReporter, SchedulePlanner,
    TrackerEngine,
};
use clap::{Arg, ArgAction, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Command::new("boxtrack")
        .version("0.1.0")
        .about("Precast box production workflow engine")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("simulate")
                .about("Drive one box through the standard pipeline")
                .arg(
                    Arg::new("tag")
                        .long("tag")
                        .default_value("B-101")
                        .help("Box tag"),
                )
                .arg(
                    Arg::new("box-type")
                        .long("box-type")
                        .default_value("Bathroom")
                        .help("Box type used to filter the catalog"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the final schedule as JSON"),
                ),
        )
        .subcommand(Command::new("validate-catalog").about("Validate the built-in activity catalog"))
        .subcommand(
            Command::new("verify-audit")
                .about("Run a short production sequence and verify the audit chain"),
        );

    match cli.get_matches().subcommand() {
        Some(("simulate", args)) => {
            let tag = args.get_one::<String>("tag").map(String::as_str).unwrap_or("B-101");
            let box_type = args
                .get_one::<String>("box-type")
                .map(String::as_str)
                .unwrap_or("Bathroom");
            let json = args.get_flag("json");
            run_simulate(tag, box_type, json).await?;
        }
        Some(("validate-catalog", _)) => run_validate_catalog(),
        Some(("verify-audit", _)) => run_verify_audit().await?,
        _ => {}
    }

    Ok(())
}

async fn run_simulate(tag: &str, box_type: &str, json: bool) -> Result<()> {
    let engine = TrackerEngine::default();
    let foreman = MemberId::new();
    let inspector = MemberId::new();

    let project = engine.create_project("PRJ-DEMO", "Demo project")?;
    let unit = engine.add_box(project.id, tag, box_type, None)?;

    let cement = engine.register_material("M-CEMENT", "Portland cement", "kg", 100, 250)?;
    engine.receive(cement.id, 1000, foreman).await?;

    let activities = engine.instantiate_schedule(unit.id).await?;
    println!(
        "Scheduled {} activities for box {} ({})",
        activities.len(),
        tag,
        box_type
    );

    engine.require_material(unit.id, cement.id, 400).await?;
    let reservation = engine.reserve(unit.id, cement.id, 400, foreman).await?;

    for activity in &activities {
        engine
            .advance_activity(activity.id, ActivityStatus::InProgress, None)
            .await?;

        if activity.activity_code.as_str() == "CAST-POUR" {
            engine.consume(reservation.box_material_id, foreman).await?;
        }

        if activity.is_wir_checkpoint {
            let record = engine.request_inspection(activity.id, foreman).await?;
            engine.begin_review(record.id, inspector).await?;
            engine
                .approve(record.id, Some(String::from("within tolerance")))
                .await?;
        }

        let receipt = engine
            .advance_activity(activity.id, ActivityStatus::Completed, None)
            .await?;
        println!(
            "{:>3}. {:<32} box progress {:6.2}%",
            activity.sequence, activity.name, receipt.box_progress
        );
    }

    let reconcile = engine.reconcile(cement.id).await?;
    println!(
        "Ledger check: current={} allocated={} drift={}",
        reconcile.ledger.current, reconcile.ledger.allocated, reconcile.drift_detected
    );

    println!(
        "Project progress: {:.2}%",
        engine.project_progress(project.id).await?
    );

    let integrity = engine.audit().verify_integrity();
    println!(
        "Audit chain: {} ({} events)",
        if integrity.valid { "VALID" } else { "INVALID" },
        integrity.events_checked
    );

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&engine.activities_of(unit.id))?
        );
    }

    if !integrity.valid || reconcile.drift_detected {
        std::process::exit(1);
    }
    Ok(())
}

fn run_validate_catalog() {
    let catalog = standard_catalog();
    println!("Catalog: {} activities", catalog.len());
    for (number, name) in catalog.stages() {
        println!("  stage {number}: {name}");
    }
    for template in catalog.templates() {
        let gate = if template.is_wir_checkpoint { " [WIR]" } else { "" };
        println!(
            "  {:>2}. {:<10} {}{}",
            template.overall_sequence,
            template.code,
            template.name,
            gate
        );
    }

    let findings = catalog.lint();
    if findings.is_empty() {
        println!("Catalog: OK");
    } else {
        for finding in &findings {
            println!("Finding: {finding}");
        }
        std::process::exit(1);
    }
}

async fn run_verify_audit() -> Result<()> {
    let engine = TrackerEngine::default();
    let foreman = MemberId::new();

    let project = engine.create_project("PRJ-AUDIT", "Audit check")?;
    let unit = engine.add_box(project.id, "B-001", "Standard", None)?;
    let activities = engine.instantiate_schedule(unit.id).await?;
    if let Some(first) = activities.first() {
        engine
            .advance_activity(first.id, ActivityStatus::InProgress, None)
            .await?;
    }

    let report = engine.audit().verify_integrity();
    println!(
        "Audit chain: {}",
        if report.valid { "VALID" } else { "INVALID" }
    );
    println!("Events checked: {}", report.events_checked);

    std::process::exit(if report.valid { 0 } else { 1 });
}
