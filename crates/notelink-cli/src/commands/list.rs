//! List command handler

use anyhow::Result;

use super::Context;
use crate::output::Output;

/// List every note with its sync destination
pub async fn list(ctx: &Context, output: &Output) -> Result<()> {
    let notes: Vec<_> = ctx
        .library
        .list()
        .await
        .into_iter()
        .map(|summary| {
            let synced = ctx
                .registry
                .get(summary.id)
                .map(|record| record.path().display().to_string());
            (summary, synced)
        })
        .collect();

    output.print_notes(&notes);
    Ok(())
}
