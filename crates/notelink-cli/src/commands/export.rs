//! Export command handlers

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use clap::Args;

use notelink_core::{ExportOptions, ExportReport, NoteId};

use super::Context;
use crate::output::Output;

/// Export flags of `notelink export`
#[derive(Args, Debug, Clone, Default)]
pub struct ExportFlags {
    /// Keep links instead of inlining the linked notes
    #[arg(long)]
    pub no_embed: bool,
    /// Keep the resolved copy as a new note
    #[arg(long)]
    pub keep_note: bool,
    /// Skip the Markdown file
    #[arg(long)]
    pub no_markdown: bool,
    /// Also write every linked note as its own Markdown file
    #[arg(long)]
    pub sub_markdown: bool,
    /// Register the separate Markdown files for sync
    #[arg(long)]
    pub sync: bool,
    /// Only export headings and highlighted lines
    #[arg(long)]
    pub highlights_only: bool,
    /// Turn escaped square brackets into plain ones
    #[arg(long)]
    pub convert_brackets: bool,
    /// Word document (needs a host renderer)
    #[arg(long)]
    pub docx: bool,
    /// PDF document (needs a host renderer)
    #[arg(long)]
    pub pdf: bool,
    /// FreeMind mind map of the outline
    #[arg(long)]
    pub mindmap: bool,
}

impl ExportFlags {
    pub fn to_options(&self) -> ExportOptions {
        ExportOptions {
            embed_link: !self.no_embed,
            export_note: self.keep_note,
            export_markdown: !self.no_markdown,
            export_sub_markdown: self.sub_markdown,
            auto_sync: self.sync,
            highlights_only: self.highlights_only,
            convert_square_brackets: self.convert_brackets,
            export_word_doc: self.docx,
            export_pdf: self.pdf,
            export_mindmap: self.mindmap,
        }
    }
}

/// Export one note into `dir`
pub async fn export(
    ctx: &Context,
    note: NoteId,
    flags: &ExportFlags,
    dir: PathBuf,
    output: &Output,
) -> Result<()> {
    let report = ctx
        .exporter(Some(dir))
        .export_note(note, &flags.to_options())
        .await
        .with_context(|| format!("Failed to export note {}", note))?;

    finish(report, output)
}

/// Export several notes into `dir`
pub async fn export_all(
    ctx: &Context,
    notes: &[NoteId],
    dir: PathBuf,
    embed: bool,
    sync: bool,
    output: &Output,
) -> Result<()> {
    let report = ctx
        .exporter(Some(dir.clone()))
        .export_to_directory(notes, &dir, embed, sync)
        .await
        .with_context(|| format!("Failed to export to {:?}", dir))?;

    finish(report, output)
}

/// Print the report; any failed unit fails the command
pub(super) fn finish(report: ExportReport, output: &Output) -> Result<()> {
    output.print_report(&report);

    let failed = report.failures().len();
    if failed > 0 {
        bail!("{} of {} unit(s) failed", failed, report.outcomes.len());
    }
    Ok(())
}
