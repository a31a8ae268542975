use std::path::Path;

use anyhow::{Context, Result};
use tera::Tera;

use vitals::info::SystemInfo;

#[derive(Debug, Clone)]
pub struct State {
    templates: Tera,
}

impl State {
    pub fn new(templates: Tera) -> Self {
        Self { templates }
    }

    /// Loads every template below `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let glob = format!("{}/**/*", dir.display());
        let templates =
            Tera::new(&glob).context(format!("could not load the templates in {dir:?}"))?;
        let template_names = templates.get_template_names().collect::<Vec<_>>();
        tracing::info!("found templates with the following names: {template_names:?}");
        Ok(Self::new(templates))
    }

    pub fn render_index(&self) -> Result<String> {
        let content = self.templates.render("index.html", &tera::Context::new())?;
        Ok(content)
    }

    pub fn render_system_info(&self, info: &SystemInfo) -> Result<String> {
        let context = tera::Context::from_serialize(info)?;
        let content = self.templates.render("systeminfo.html", &context)?;
        Ok(content)
    }
}
