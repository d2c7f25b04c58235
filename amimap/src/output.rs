use std::{fs, path::Path};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::mapping::Template;

/// Document formats accepted by CloudFormation
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum Format {
  Yaml,
  Json,
}

impl Default for Format {
  fn default() -> Self {
    Self::Yaml
  }
}

/// Render the template in the given format, terminated by a newline
pub fn render(template: &Template, format: Format) -> Result<String> {
  let mut rendered = match format {
    Format::Yaml => serde_yaml::to_string(template)?,
    Format::Json => serde_json::to_string_pretty(template)?,
  };

  if !rendered.ends_with('\n') {
    rendered.push('\n');
  }

  Ok(rendered)
}

/// Write the rendered document to the file provided, or stdout when there is none
pub fn write<P: AsRef<Path>>(rendered: &str, path: Option<P>) -> Result<()> {
  match path {
    Some(path) => {
      let path = path.as_ref();
      fs::write(path, rendered).with_context(|| format!("Failed to write {}", path.display()))?;
      info!("Mapping written to {}", path.display());
    }
    None => print!("{rendered}"),
  }

  Ok(())
}
