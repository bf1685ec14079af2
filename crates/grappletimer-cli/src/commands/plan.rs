use chrono::{Local, Utc};
use clap::Args;
use grappletimer_core::{format_clock, Config, NotificationPlan, Session};

use super::TimerArgs;

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub timer: TimerArgs,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: PlanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let timer = args.timer.resolve(&config)?;
    let session = Session::new(timer, Utc::now())?;
    let plan = NotificationPlan::for_session(&session);
    let timeline = timer.timeline();

    if args.json {
        let out = serde_json::json!({
            "configuration": timer,
            "total_duration_ms": timer.total_duration_ms(),
            "timeline": timeline,
            "notifications": plan.entries(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "Total: {}",
        format_clock(u64::try_from(timer.total_duration_ms()).unwrap_or(0))
    );
    for span in &timeline {
        let offset = format_clock(u64::try_from(span.offset_ms).unwrap_or(0));
        if span.duration_ms > 0 {
            let length = format_clock(u64::try_from(span.duration_ms).unwrap_or(0));
            println!("  {offset:>6}  {:<14} {length}", span.phase.to_string());
        } else {
            println!("  {offset:>6}  {}", span.phase);
        }
    }

    println!();
    println!("Notifications if started now:");
    for n in plan.entries() {
        println!(
            "  {}  {}: {}",
            n.fire_at.with_timezone(&Local).format("%H:%M:%S"),
            n.title,
            n.body
        );
    }
    Ok(())
}
