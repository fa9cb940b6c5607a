//! Metrics handler: surfaces the API-call tracker's (C12) summary.

use anyhow::Result;

use crate::cli::output::{output_json, print_kv, print_section, OutputMode};
use crate::init::Context;

pub async fn handle_metrics(ctx: &Context, mode: OutputMode) -> Result<()> {
    let summary = ctx.tracker.summary();

    if mode == OutputMode::Json {
        output_json(&summary);
        return Ok(());
    }

    print_section("API-call tracker summary", "");
    print_kv("total calls", &summary.total_calls.to_string());
    print_kv("successful calls", &summary.successful_calls.to_string());
    print_kv("success rate", &format!("{:.1}%", summary.success_rate * 100.0));
    print_kv("total cost (usd)", &format!("{:.4}", summary.total_cost_usd));

    print_section("Per-model", "");
    for (model, stats) in &summary.per_model {
        println!(
            "  {}: {} calls, {} successes, ${:.4}",
            model, stats.calls, stats.successes, stats.cost_usd
        );
    }

    Ok(())
}
