use crate::infra::{seed_demo_placements, InMemoryPlacements, LoggingCascadeSink};
use chrono::Local;
use clap::Args;
use std::sync::Arc;

use placement_desk::error::AppError;
use placement_desk::workflows::withdrawals::{
    ActingUser, EntityId, EntityKind, EntityRef, Permission, WithdrawalReason, WithdrawalService,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Mark the demo booking as arrived to show a blocked record
    #[arg(long)]
    pub(crate) arrived: bool,
}

/// Seeds a placement chain, prints its withdrawable tree, then withdraws the
/// application and reports what cascaded.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let placements = Arc::new(InMemoryPlacements::default());
    seed_demo_placements(&placements, args.arrived);

    let service = WithdrawalService::new(
        placements.clone(),
        placements.clone(),
        placements.clone(),
        Arc::new(LoggingCascadeSink),
    );

    let user = ActingUser::new(
        "duty-manager",
        [
            Permission::WithdrawApplication,
            Permission::WithdrawPlacementRequest,
            Permission::WithdrawMatchRequest,
            Permission::WithdrawBooking,
        ],
    );
    let target = EntityRef::new(EntityKind::Application, EntityId::new("app-2025-0117"));

    println!("Placement withdrawal demo");
    println!("Acting user: {} (all direct-withdrawal permissions)", user.id);

    let tree = service.withdrawable_tree(&target, &user)?;
    println!("\nWithdrawable tree");
    print!("{}", tree.render());

    let notes = tree.notes();
    if notes.is_empty() {
        println!("\nBlocked records: none");
    } else {
        println!("\nBlocked records");
        for note in notes {
            println!("- {note}");
        }
    }

    let receipt = service.withdraw(
        &target,
        &user,
        WithdrawalReason::PlacementNoLongerRequired,
        None,
        Local::now().date_naive(),
    )?;

    println!("\nWithdrew {} ({})", receipt.root, receipt.reason.label());
    if receipt.cascaded.is_empty() {
        println!("Cascaded to: nothing");
    } else {
        println!("Cascaded to:");
        for entity in &receipt.cascaded {
            println!("- {entity}");
        }
    }

    println!("\nRecord states after withdrawal");
    if let Some(status) = placements.application_status(&EntityId::new("app-2025-0117")) {
        println!("- application app-2025-0117: {}", status.label());
    }
    for id in ["pr-alpha", "pr-beta"] {
        if let Some(status) = placements.placement_request_status(&EntityId::new(id)) {
            println!("- placement_request {id}: {}", status.label());
        }
    }
    for id in ["mr-alpha", "mr-legacy"] {
        if let Some(status) = placements.match_request_status(&EntityId::new(id)) {
            println!("- match_request {id}: {}", status.label());
        }
    }
    if let Some(status) = placements.booking_status(&EntityId::new("bk-oak-12")) {
        println!("- booking bk-oak-12: {}", status.label());
    }

    Ok(())
}
