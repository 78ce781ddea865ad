use crate::infra::{LocalBlobStore, LogNotifier};
use clap::Args;
use rust_decimal::Decimal;
use std::sync::Arc;
use tenant_exit::error::AppError;
use tenant_exit::workflows::moveout::{
    DamageReportForm, DamageReportSubmission, DamagedItem, ExitRequestSubmission,
    InMemoryRecordStore, MoveOutState, SessionManager, UserRegistry,
};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Tenant identifier used for the sample exit request.
    #[arg(long, default_value = "T1")]
    pub(crate) tenant_id: String,
    /// Room the sample tenant is vacating.
    #[arg(long, default_value = "101")]
    pub(crate) room_number: String,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        tenant_id,
        room_number,
    } = args;

    let state = MoveOutState::new(
        Arc::new(InMemoryRecordStore::new()),
        Arc::new(LocalBlobStore::new(
            std::env::temp_dir().join("tenant-exit-demo"),
            "http://127.0.0.1:3000/files",
        )),
        Arc::new(LogNotifier::new("no-reply@tenant-exit.local")),
        UserRegistry::demo(),
        Arc::new(SessionManager::new(
            "demo-session-secret",
            chrono::Duration::minutes(30),
        )),
    );

    println!("=== Exit request ===");
    let receipt = state
        .exit_requests
        .submit(ExitRequestSubmission {
            tenant_id: tenant_id.clone(),
            name: "Demo Tenant".to_string(),
            room_number: room_number.clone(),
            exit_reason: "Relocating for work".to_string(),
            email: "tenant@example.com".to_string(),
            moveout_checklist: vec!["Return keys".to_string(), "Final meter reading".to_string()],
            supporting_document: None,
        })
        .await?;
    println!(
        "Submitted {} (confirmation sent: {})",
        receipt.request_id, receipt.confirmation_sent
    );

    println!("\n=== Damage report ===");
    let items = vec![
        DamagedItem {
            item: "Wall paint".to_string(),
            price: Decimal::new(120_00, 2),
        },
        DamagedItem {
            item: "Broken blind".to_string(),
            price: Decimal::new(35_50, 2),
        },
    ];
    let estimated_cost = items.iter().map(|item| item.price).sum();
    let damage = state
        .damage_reports
        .submit(DamageReportSubmission {
            form: DamageReportForm {
                tenant_id: tenant_id.clone(),
                room_number: room_number.clone(),
                damaged_items: items,
                estimated_cost,
            },
            document: None,
            notify_email: Some("tenant@example.com".to_string()),
        })
        .await?;
    println!("Recorded damage report {}", damage.report_id);

    println!("\n=== Admin review ===");
    let updated = state
        .admin
        .update_status(&receipt.request_id, "Approved")
        .await?;
    println!(
        "Request {} is now {}",
        updated.request_id, updated.request_status
    );
    let summary = state.admin.summary().await?;
    println!(
        "Summary: total={} approved={} pending={} rejected={}",
        summary.total, summary.approved, summary.pending, summary.rejected
    );

    println!("\n=== Landlord timeline ===");
    for event in state.views.move_timeline().await? {
        println!("{} | {}", event.date.format("%Y-%m-%d %H:%M"), event.description);
    }

    println!("\n=== Tenant view ===");
    for view in state.views.tenant_exit_requests(&tenant_id).await? {
        println!("{} | room {} | {}", view.request_id, view.room_number, view.status);
    }

    println!("\n=== CSV export ===");
    let report = state.exit_requests.generate_report(&tenant_id).await?;
    println!("{}", report.filename);
    print!("{}", String::from_utf8_lossy(&report.body));

    Ok(())
}
