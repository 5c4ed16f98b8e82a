//! Export orchestration
//!
//! Ties the resolver, the unit builder, the serializers and the sync
//! registry together.
//!
//! A single-document export ([`Exporter::export_note`]) is all or nothing:
//! any failure aborts it and erases the temporary note built for
//! embedding. Batch exports report one outcome per unit and keep going
//! past failed units.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::error::ExportError;
use super::fs::ExportFs;
use super::host::{ExportHost, FileFilter};
use super::naming::{export_filename, suggested_name, with_extension};
use super::options::ExportOptions;
use super::render::{
    await_render, DocumentKind, ExternalRenderer, RenderCompletion, RenderOutput, RenderRequest,
};
use super::report::{ExportReport, UnitOutcome};
use super::temp::TempNote;
use crate::config::Config;
use crate::format::{mind_map, referenced_resources, serialize_markdown, to_freemind, MarkdownOptions};
use crate::models::{ExportMode, ExportUnit, NoteId, Resource, SyncRecord};
use crate::outline::build_outline;
use crate::resolver::{resolve, Resolution};
use crate::scanner::LinkScanner;
use crate::store::LineStore;
use crate::sync::SyncRegistry;
use crate::template::TemplateRenderer;

pub struct Exporter {
    store: Arc<dyn LineStore>,
    templates: Arc<dyn TemplateRenderer>,
    fs: Arc<dyn ExportFs>,
    host: Arc<dyn ExportHost>,
    renderer: Option<Arc<dyn ExternalRenderer>>,
    registry: Arc<SyncRegistry>,
    scanner: LinkScanner,
    config: Config,
}

impl Exporter {
    pub fn new(
        store: Arc<dyn LineStore>,
        templates: Arc<dyn TemplateRenderer>,
        fs: Arc<dyn ExportFs>,
        host: Arc<dyn ExportHost>,
        registry: Arc<SyncRegistry>,
        config: Config,
    ) -> Self {
        Self {
            store,
            templates,
            fs,
            host,
            renderer: None,
            registry,
            scanner: LinkScanner::new(&config.link_scheme),
            config,
        }
    }

    /// Attach the renderer used for Word and PDF output
    pub fn with_renderer(mut self, renderer: Arc<dyn ExternalRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn registry(&self) -> &SyncRegistry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn base_markdown(&self) -> MarkdownOptions {
        MarkdownOptions {
            attachments_dir: self.config.attachments_dir.clone(),
            ..MarkdownOptions::default()
        }
    }

    fn markdown_options(&self, options: &ExportOptions) -> MarkdownOptions {
        MarkdownOptions {
            highlights_only: options.highlights_only,
            convert_square_brackets: options.convert_square_brackets,
            ..self.base_markdown()
        }
    }

    // ------------------------------------------------------------------
    // Single note
    // ------------------------------------------------------------------

    /// Export one note according to `options`
    ///
    /// Returns an empty report when no action flag is set.
    pub async fn export_note(
        &self,
        note: NoteId,
        options: &ExportOptions,
    ) -> Result<ExportReport, ExportError> {
        let mut report = ExportReport::new();
        if !options.has_action() {
            info!("No export action requested for note {}, nothing to do", note);
            return Ok(report);
        }

        // Unknown notes fail before anything is created
        self.store.get_lines(note).await?;

        let temp = if options.needs_copy() {
            let mode = if options.embed_link {
                ExportMode::Embed
            } else {
                ExportMode::Link
            };
            let (temp, resolution) = self.resolve_into_temp(note, mode).await?;
            report.misses = resolution.misses;
            Some(temp)
        } else {
            None
        };
        let source = temp.as_ref().map_or(note, TempNote::id);

        if let Err(e) = self
            .export_document(note, source, temp.is_some(), options, &mut report)
            .await
        {
            warn!("Export of note {} failed: {}", note, e);
            if let Some(temp) = temp {
                if let Err(cleanup) = temp.discard().await {
                    warn!("Failed to erase temporary note {}: {}", source, cleanup);
                }
            }
            return Err(e);
        }

        if let Some(temp) = temp {
            if options.export_note {
                let kept = temp.keep();
                info!("Kept resolved copy of note {} as note {}", note, kept);
                self.host.open_viewer(kept).await;
                report.kept_note = Some(kept);
            } else if let Err(e) = temp.discard().await {
                warn!("Failed to erase temporary note {}: {}", source, e);
                report.retained.push(source);
            }
        }

        Ok(report)
    }

    /// Copy `note` with its links resolved into a temporary note
    async fn resolve_into_temp(
        &self,
        note: NoteId,
        mode: ExportMode,
    ) -> Result<(TempNote, Resolution), ExportError> {
        let visited = HashSet::from([note]);
        let resolution = resolve(self.store.as_ref(), &self.scanner, &[note], mode, &visited).await?;

        let temp = TempNote::create(
            Arc::clone(&self.store),
            Arc::clone(&self.host),
            resolution.lines.clone(),
        )
        .await?;

        let mut sources = vec![note];
        sources.extend(resolution.embedded.iter().copied());
        if let Err(e) = self.store.copy_embedded_resources(&sources, temp.id()).await {
            if let Err(cleanup) = temp.discard().await {
                warn!("Failed to erase temporary note: {}", cleanup);
            }
            return Err(e.into());
        }

        debug!(
            "Resolved note {} into temporary note {} ({} lines)",
            note,
            temp.id(),
            resolution.lines.len()
        );
        Ok((temp, resolution))
    }

    async fn export_document(
        &self,
        root: NoteId,
        source: NoteId,
        is_temporary: bool,
        options: &ExportOptions,
        report: &mut ExportReport,
    ) -> Result<(), ExportError> {
        let title = self.store.note_title(source).await?;
        let markdown = self.markdown_options(options);

        if options.export_markdown {
            let suggested = suggested_name(&title, root, "md");
            match self
                .host
                .pick_file("Export Markdown Document", &suggested, &FileFilter::MARKDOWN)
                .await
            {
                Some(path) => {
                    let (dir, filename) = split_path(&path)?;
                    let (unit, resources) =
                        self.build_unit(source, filename, is_temporary, &markdown).await?;
                    let written = self.write_unit(&dir, &unit, &resources).await?;
                    report.push(UnitOutcome::Written {
                        note: root,
                        path: written,
                    });
                }
                None => report.push(skipped(root, "no Markdown destination picked")),
            }
        }

        if options.export_word_doc {
            self.export_rendered(root, source, &title, DocumentKind::Docx, &markdown, report)
                .await?;
        }
        if options.export_pdf {
            self.export_rendered(root, source, &title, DocumentKind::Pdf, &markdown, report)
                .await?;
        }

        if options.export_mindmap {
            let suggested = suggested_name(&title, root, "mm");
            match self
                .host
                .pick_file("Export FreeMind", &suggested, &FileFilter::FREEMIND)
                .await
            {
                Some(path) => {
                    let lines = self.store.get_lines(source).await?;
                    let map = mind_map(&title, &build_outline(&lines));
                    self.fs
                        .write(&path, to_freemind(&map).as_bytes())
                        .await
                        .map_err(|e| ExportError::from_io(e, &path))?;
                    info!("Exported mind map of note {} to {:?}", root, path);
                    self.host
                        .notify(&format!("Note saved to {}", path.display()));
                    report.push(UnitOutcome::Written { note: root, path });
                }
                None => report.push(skipped(root, "no FreeMind destination picked")),
            }
        }

        if options.auto_sync && self.registry.is_synced(root) {
            debug!("Note {} is synced, re-exporting to its recorded destination", root);
            let batch = self.sync_notes(&[root]).await?;
            report.merge(batch);
        } else if options.wants_batch() {
            let title = if options.auto_sync {
                "Sync Markdown"
            } else {
                "Export Markdown"
            };
            match self.host.pick_directory(title).await {
                Some(dir) => {
                    let batch = self
                        .export_batch(&[root], &dir, false, options.auto_sync, &markdown)
                        .await?;
                    report.merge(batch);
                }
                None => report.push(skipped(root, "no export directory picked")),
            }
        }

        Ok(())
    }

    /// Hand the resolved document to the external renderer and wait for it
    async fn export_rendered(
        &self,
        root: NoteId,
        source: NoteId,
        title: &str,
        kind: DocumentKind,
        markdown: &MarkdownOptions,
        report: &mut ExportReport,
    ) -> Result<(), ExportError> {
        let Some(renderer) = self.renderer.as_ref() else {
            let error = ExportError::RendererUnavailable(kind);
            warn!("Skipping {} export of note {}: {}", kind, root, error);
            report.push(UnitOutcome::failed(root, &error));
            return Ok(());
        };

        let lines = self.store.get_lines(source).await?;
        let resources = self.store.resources(source).await?;
        let request = RenderRequest {
            kind,
            note: source,
            title: title.to_string(),
            markdown: serialize_markdown(&lines, &resources, markdown),
        };

        self.host.open_viewer(source).await;
        let (completion, receiver) = RenderCompletion::channel();
        debug!("Sending {} to the renderer for note {}", kind.signal(), source);

        let rendered = async {
            renderer.request(request, completion).await?;
            await_render(
                renderer.as_ref(),
                kind,
                receiver,
                self.config.render_poll_interval(),
                self.config.render_max_attempts,
            )
            .await
        }
        .await;

        if kind == DocumentKind::Pdf {
            self.host.close_viewer(source).await;
        }

        match rendered? {
            RenderOutput::Delivered => {
                info!("{} export of note {} delivered by the renderer", kind, root);
                report.push(UnitOutcome::Delivered { note: root, kind });
            }
            RenderOutput::Content(bytes) => {
                let suggested = suggested_name(title, root, kind.extension());
                let filter = match kind {
                    DocumentKind::Docx => FileFilter::DOCX,
                    DocumentKind::Pdf => FileFilter::PDF,
                };
                let picked = self
                    .host
                    .pick_file(&format!("Export {} Document", kind), &suggested, &filter)
                    .await;
                match picked {
                    Some(path) => {
                        self.fs
                            .write(&path, &bytes)
                            .await
                            .map_err(|e| ExportError::from_io(e, &path))?;
                        info!("Exported {} of note {} to {:?}", kind, root, path);
                        self.host
                            .notify(&format!("Note saved to {}", path.display()));
                        report.push(UnitOutcome::Written { note: root, path });
                    }
                    None => report.push(skipped(root, "no destination picked")),
                }
            }
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Units
    // ------------------------------------------------------------------

    /// Serialize a note into an export unit plus the resources it references
    pub async fn build_unit(
        &self,
        note: NoteId,
        filename: String,
        is_temporary: bool,
        markdown: &MarkdownOptions,
    ) -> Result<(ExportUnit, Vec<Resource>), ExportError> {
        let lines = self.store.get_lines(note).await?;
        let resources = self.store.resources(note).await?;

        let content = serialize_markdown(&lines, &resources, markdown);
        let used = referenced_resources(&lines, &resources)
            .into_iter()
            .cloned()
            .collect();

        Ok((
            ExportUnit {
                note,
                filename,
                content,
                is_temporary,
            },
            used,
        ))
    }

    /// Write a unit and its resources below `dir`
    async fn write_unit(
        &self,
        dir: &Path,
        unit: &ExportUnit,
        resources: &[Resource],
    ) -> Result<PathBuf, ExportError> {
        if !resources.is_empty() {
            let attachments = dir.join(&self.config.attachments_dir);
            self.fs
                .create_dir_all(&attachments)
                .await
                .map_err(|e| ExportError::from_io(e, &attachments))?;

            for resource in resources {
                // Resource names never escape the attachments directory
                let Some(name) = Path::new(&resource.filename).file_name() else {
                    warn!("Skipping resource {} with unusable name", resource.key);
                    continue;
                };
                let path = attachments.join(name);
                self.fs
                    .write(&path, &resource.data)
                    .await
                    .map_err(|e| ExportError::from_io(e, &path))?;
            }
        }

        let path = dir.join(&unit.filename);
        self.fs
            .write(&path, unit.content.as_bytes())
            .await
            .map_err(|e| ExportError::from_io(e, &path))?;

        info!(
            "Exported note {} to {:?} ({} bytes)",
            unit.note,
            path,
            unit.content.len()
        );
        self.host.notify(&format!("Note saved to {}", path.display()));
        Ok(path)
    }

    // ------------------------------------------------------------------
    // Batches
    // ------------------------------------------------------------------

    /// Export notes into a picked directory
    ///
    /// With `embed` every note becomes one self-contained file. Otherwise
    /// every reachable note is written once and inter-note links point at
    /// sibling files; `sync` then registers each file for re-export.
    pub async fn export_notes_to_markdown(
        &self,
        notes: &[NoteId],
        embed: bool,
        sync: bool,
    ) -> Result<ExportReport, ExportError> {
        let title = if sync {
            "Sync Markdown"
        } else {
            "Export Markdown"
        };
        let Some(dir) = self.host.pick_directory(title).await else {
            info!("No export directory picked, nothing exported");
            let mut report = ExportReport::new();
            for &note in notes {
                report.push(skipped(note, "no export directory picked"));
            }
            return Ok(report);
        };

        self.export_to_directory(notes, &dir, embed, sync).await
    }

    /// Like [`Exporter::export_notes_to_markdown`] with a known directory
    pub async fn export_to_directory(
        &self,
        notes: &[NoteId],
        dir: &Path,
        embed: bool,
        sync: bool,
    ) -> Result<ExportReport, ExportError> {
        self.export_batch(notes, dir, embed, sync, &self.base_markdown())
            .await
    }

    async fn export_batch(
        &self,
        notes: &[NoteId],
        dir: &Path,
        embed: bool,
        sync: bool,
        markdown: &MarkdownOptions,
    ) -> Result<ExportReport, ExportError> {
        self.fs
            .create_dir_all(dir)
            .await
            .map_err(|e| ExportError::from_io(e, dir))?;

        let mut report = ExportReport::new();
        if embed {
            if sync {
                warn!("Sync applies to linked exports only; embedded files are not registered");
            }
            let mut used = HashSet::new();
            for &note in notes {
                match self
                    .export_embedded_unit(note, dir, markdown, &mut used, &mut report)
                    .await
                {
                    Ok(path) => report.push(UnitOutcome::Written { note, path }),
                    Err(e) => {
                        warn!("Export of note {} failed: {}", note, e);
                        report.push(UnitOutcome::failed(note, &e));
                    }
                }
            }
        } else {
            let roots = self.existing_roots(notes, &mut report).await;
            let resolution = resolve(
                self.store.as_ref(),
                &self.scanner,
                &roots,
                ExportMode::Link,
                &HashSet::new(),
            )
            .await?;
            report.misses.extend(resolution.misses);

            // Re-syncing into the same directory keeps the recorded names
            let preset = if sync {
                self.recorded_names(&resolution.units, Some(dir))
            } else {
                HashMap::new()
            };
            let (names, link_targets) = self.assign_filenames(&resolution.units, &preset).await;
            let markdown = MarkdownOptions {
                link_targets,
                ..markdown.clone()
            };

            for (note, filename) in names {
                let written = self
                    .export_linked_unit(note, &filename, dir, &markdown, sync)
                    .await;
                match written {
                    Ok(path) => report.push(UnitOutcome::Written { note, path }),
                    Err(e) => {
                        warn!("Export of note {} failed: {}", note, e);
                        report.push(UnitOutcome::failed(note, &e));
                    }
                }
            }
        }

        info!(
            "Exported {} of {} unit(s) to {:?}",
            report.written().len(),
            report.outcomes.len(),
            dir
        );
        Ok(report)
    }

    async fn export_embedded_unit(
        &self,
        note: NoteId,
        dir: &Path,
        markdown: &MarkdownOptions,
        used: &mut HashSet<String>,
        report: &mut ExportReport,
    ) -> Result<PathBuf, ExportError> {
        let lines = self.store.get_lines(note).await?;
        let rendered = self.filename(note).await;
        let filename = unique_filename(used, rendered, note);

        if !lines.iter().any(|line| self.scanner.has_links(line)) {
            let (unit, resources) = self.build_unit(note, filename, false, markdown).await?;
            return self.write_unit(dir, &unit, &resources).await;
        }

        let (temp, resolution) = self.resolve_into_temp(note, ExportMode::Embed).await?;
        report.misses.extend(resolution.misses);

        let built = self.build_unit(temp.id(), filename, true, markdown).await;
        let (unit, resources) = match built {
            Ok(built) => built,
            Err(e) => {
                if let Err(cleanup) = temp.discard().await {
                    warn!("Failed to erase temporary note: {}", cleanup);
                }
                return Err(e);
            }
        };

        match self.write_unit(dir, &unit, &resources).await {
            Ok(path) => {
                // Only erase once the content is safely on disk
                if let Err(e) = temp.discard().await {
                    warn!("Failed to erase temporary note {}: {}", unit.note, e);
                    report.retained.push(unit.note);
                }
                Ok(path)
            }
            Err(e) => {
                let kept = temp.keep();
                warn!(
                    "Write of note {} failed, resolved copy retained as note {}",
                    note, kept
                );
                report.retained.push(kept);
                Err(e)
            }
        }
    }

    async fn export_linked_unit(
        &self,
        note: NoteId,
        filename: &str,
        dir: &Path,
        markdown: &MarkdownOptions,
        sync: bool,
    ) -> Result<PathBuf, ExportError> {
        let (unit, resources) = self
            .build_unit(note, filename.to_string(), false, markdown)
            .await?;
        let path = self.write_unit(dir, &unit, &resources).await?;

        if sync {
            self.registry
                .record(note, dir, filename)
                .map_err(|e| ExportError::Registry(format!("{:#}", e)))?;
        }
        Ok(path)
    }

    /// Notes that still exist; the rest are reported as failed
    async fn existing_roots(&self, notes: &[NoteId], report: &mut ExportReport) -> Vec<NoteId> {
        let mut roots = Vec::with_capacity(notes.len());
        for &note in notes {
            match self.store.get_lines(note).await {
                Ok(_) => roots.push(note),
                Err(e) => {
                    let error = ExportError::from(e);
                    warn!("Cannot export note {}: {}", note, error);
                    report.push(UnitOutcome::failed(note, &error));
                }
            }
        }
        roots
    }

    async fn filename(&self, note: NoteId) -> String {
        export_filename(
            self.store.as_ref(),
            self.templates.as_ref(),
            &self.config.filename_template,
            note,
        )
        .await
    }

    /// Filenames for every unit plus the URI → filename map used to
    /// rewrite inter-note links. `preset` names are kept as they are.
    async fn assign_filenames(
        &self,
        units: &[NoteId],
        preset: &HashMap<NoteId, String>,
    ) -> (Vec<(NoteId, String)>, BTreeMap<String, String>) {
        let mut used: HashSet<String> = units
            .iter()
            .filter_map(|note| preset.get(note).cloned())
            .collect();
        let mut names = Vec::with_capacity(units.len());
        let mut targets = BTreeMap::new();

        for &note in units {
            let name = match preset.get(&note) {
                Some(name) => name.clone(),
                None => {
                    let rendered = self.filename(note).await;
                    unique_filename(&mut used, rendered, note)
                }
            };
            match self.store.note_key(note).await {
                Ok(key) => {
                    targets.insert(key.to_uri(self.scanner.scheme()), name.clone());
                }
                Err(e) => debug!("No link key for note {}: {}", note, e),
            }
            names.push((note, name));
        }

        (names, targets)
    }

    // ------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------

    /// Recorded filenames of the synced `units`, optionally only those
    /// synced into `dir`
    fn recorded_names(&self, units: &[NoteId], dir: Option<&Path>) -> HashMap<NoteId, String> {
        units
            .iter()
            .filter_map(|note| self.registry.get(*note))
            .filter(|record| dir.map_or(true, |dir| record.directory == dir))
            .map(|record| (record.note_id, record.filename))
            .collect()
    }

    /// Re-export notes to their recorded destinations
    ///
    /// Synced notes are written without prompting. Notes without a record
    /// share one directory prompt and become synced.
    pub async fn sync_notes(&self, notes: &[NoteId]) -> Result<ExportReport, ExportError> {
        let mut report = ExportReport::new();
        let (synced, unsynced): (Vec<NoteId>, Vec<NoteId>) = notes
            .iter()
            .copied()
            .partition(|note| self.registry.is_synced(*note));

        if !synced.is_empty() {
            let roots = self.existing_roots(&synced, &mut report).await;
            let resolution = resolve(
                self.store.as_ref(),
                &self.scanner,
                &roots,
                ExportMode::Link,
                &HashSet::new(),
            )
            .await?;
            report.misses.extend(resolution.misses);

            // Linked notes synced elsewhere keep their recorded names
            let preset = self.recorded_names(&resolution.units, None);
            let (_, link_targets) = self.assign_filenames(&resolution.units, &preset).await;
            let markdown = MarkdownOptions {
                link_targets,
                ..self.base_markdown()
            };

            for note in roots {
                let Some(record) = self.registry.get(note) else {
                    continue;
                };
                match self.sync_unit(&record, &markdown).await {
                    Ok(path) => report.push(UnitOutcome::Written { note, path }),
                    Err(e) => {
                        warn!("Sync of note {} failed: {}", note, e);
                        report.push(UnitOutcome::failed(note, &e));
                    }
                }
            }
        }

        if !unsynced.is_empty() {
            info!("{} note(s) have no sync destination yet", unsynced.len());
            let batch = self.export_notes_to_markdown(&unsynced, false, true).await?;
            report.merge(batch);
        }

        Ok(report)
    }

    async fn sync_unit(
        &self,
        record: &SyncRecord,
        markdown: &MarkdownOptions,
    ) -> Result<PathBuf, ExportError> {
        // Recorded destinations are never recreated
        if !self.fs.exists(&record.directory).await {
            return Err(ExportError::from_io(
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "sync directory no longer exists",
                ),
                &record.directory,
            ));
        }

        let (unit, resources) = self
            .build_unit(record.note_id, record.filename.clone(), false, markdown)
            .await?;
        let path = self.write_unit(&record.directory, &unit, &resources).await?;
        self.registry
            .touch(record.note_id)
            .map_err(|e| ExportError::Registry(format!("{:#}", e)))?;
        Ok(path)
    }

    /// Stop syncing a note. Returns whether it was synced.
    pub async fn unsync(&self, note: NoteId) -> Result<bool, ExportError> {
        let removed = self
            .registry
            .remove(note)
            .map_err(|e| ExportError::Registry(format!("{:#}", e)))?;
        if removed.is_some() {
            info!("Note {} is no longer synced", note);
        }
        Ok(removed.is_some())
    }
}

fn skipped(note: NoteId, reason: &str) -> UnitOutcome {
    UnitOutcome::Skipped {
        note,
        reason: reason.to_string(),
    }
}

/// Split a picked file path into its directory and file name
fn split_path(path: &Path) -> Result<(PathBuf, String), ExportError> {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            ExportError::from_io(
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file path"),
                path,
            )
        })?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, filename))
}

/// Claim `name`, or `<stem>-<id>.md` when another unit already has it
fn unique_filename(used: &mut HashSet<String>, name: String, note: NoteId) -> String {
    if used.insert(name.clone()) {
        return name;
    }
    let stem = name.strip_suffix(".md").unwrap_or(&name);
    let candidate = with_extension(&format!("{}-{}", stem, note), "md");
    used.insert(candidate.clone());
    candidate
}
