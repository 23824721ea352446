//! Named template collections loaded from memory or disk.
//!
//! Templates loaded from files are named after the file stem, so
//! `templates/sub/greeting.txt` becomes `greeting`. Directory walks visit
//! entries in sorted path order. Two files with the same stem in one load
//! fail with [`TieError::DuplicateTemplate`] and nothing is added. Adding a
//! template whose name already exists replaces it in place.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::{DefaultRenderer, Renderer, Template};
use crate::context::{Context, Rendered};
use crate::error::{Result, TieError};

/// An ordered set of named templates sharing a renderer.
#[derive(Clone)]
pub struct TemplateSet {
    templates: Vec<Template>,
    renderer: Arc<dyn Renderer>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self {
            templates: Vec::new(),
            renderer: Arc::new(DefaultRenderer::new()),
        }
    }

    /// Sets the renderer used by every template in the set, including
    /// templates already added.
    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        let renderer: Arc<dyn Renderer> = Arc::new(renderer);
        for template in &mut self.templates {
            *template = template.clone().with_shared_renderer(Arc::clone(&renderer));
        }
        self.renderer = renderer;
        self
    }

    /// Adds a template, keeping its own renderer.
    pub fn add(&mut self, template: Template) {
        match self
            .templates
            .iter_mut()
            .find(|t| t.name() == template.name())
        {
            Some(existing) => *existing = template,
            None => self.templates.push(template),
        }
    }

    /// Adds an in-memory template that uses the set's renderer.
    pub fn add_inline(&mut self, name: impl Into<String>, source: impl Into<String>) {
        let template =
            Template::named(name, source).with_shared_renderer(Arc::clone(&self.renderer));
        self.add(template);
    }

    /// Loads a single file, returning the template name.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<String> {
        let template =
            Template::from_file(path)?.with_shared_renderer(Arc::clone(&self.renderer));
        let name = template.name().to_string();
        self.add(template);
        Ok(name)
    }

    /// Loads every file under `dir`, descending into subdirectories when
    /// `recursive` is set. Returns the number of templates loaded.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>, recursive: bool) -> Result<usize> {
        let dir = dir.as_ref();
        let mut files = Vec::new();
        walk_dir(dir, recursive, &mut files)?;

        let mut loaded: Vec<Template> = Vec::with_capacity(files.len());
        for path in &files {
            let template =
                Template::from_file(path)?.with_shared_renderer(Arc::clone(&self.renderer));
            if loaded.iter().any(|t| t.name() == template.name()) {
                return Err(TieError::DuplicateTemplate(template.name().to_string()));
            }
            loaded.push(template);
        }

        let count = loaded.len();
        for template in loaded {
            self.add(template);
        }
        debug!(dir = %dir.display(), count, "templates loaded");
        Ok(count)
    }

    pub fn get(&self, name: &str) -> Result<&Template> {
        self.templates
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| TieError::TemplateNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.iter().any(|t| t.name() == name)
    }

    /// Renders the template called `name`.
    pub fn render(&self, name: &str, ctx: &Context) -> Result<Rendered> {
        self.get(name)?.render(ctx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(Template::name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn clear(&mut self) {
        self.templates.clear();
    }
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSet")
            .field("names", &self.names().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn walk_dir(dir: &Path, recursive: bool, files: &mut Vec<PathBuf>) -> Result<()> {
    let io_err = |source: std::io::Error| TieError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = std::fs::read_dir(dir)
        .map_err(io_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(io_err)?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            if recursive {
                walk_dir(&path, recursive, files)?;
            }
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}
