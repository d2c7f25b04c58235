use std::path::PathBuf;

use anyhow::Result;
use aws_types::region::Region;
use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use tracing::info;

use crate::{
  ec2::{self, ImageQuery, DEFAULT_NAME_PATTERN, DEFAULT_OWNER_ALIAS},
  mapping::{self, Template},
  output::{self, Format},
};

/// Styles for CLI
fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .literal(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::BrightCyan))),
    )
    .usage(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
}

/// Generate a CloudFormation mapping of the latest Amazon Linux AMI per region
///
/// arm64 images are preferred (`t4g`); regions without one fall back to x86_64 images (`t3`)
#[derive(Debug, Parser)]
#[command(author, about, version)]
#[command(styles=get_styles())]
pub struct Cli {
  /// The region used to discover the enabled regions
  #[arg(short, long, env = "AWS_DEFAULT_REGION")]
  pub region: Option<String>,

  /// Only collect images for these regions instead of all enabled regions
  #[arg(long, value_delimiter = ',')]
  pub target_region: Vec<String>,

  /// Wildcard pattern matched against the image name
  #[arg(long, default_value = DEFAULT_NAME_PATTERN)]
  pub name: String,

  /// Owner alias of the images
  #[arg(long, default_value = DEFAULT_OWNER_ALIAS)]
  pub owner_alias: String,

  /// Maximum number of attempts for each EC2 API call
  #[arg(long, default_value_t = 3)]
  pub retries: u32,

  /// Format of the generated document
  #[arg(short, long, value_enum, default_value_t)]
  pub format: Format,

  /// Write the document to this file instead of stdout
  #[arg(short, long)]
  pub output: Option<PathBuf>,

  #[clap(flatten)]
  pub verbose: Verbosity<WarnLevel>,
}

impl Cli {
  fn image_query(&self) -> ImageQuery {
    ImageQuery {
      name: self.name.to_owned(),
      owner_alias: self.owner_alias.to_owned(),
    }
  }

  pub async fn run(&self) -> Result<()> {
    let config = crate::get_sdk_config(self.region.to_owned()).await?;

    let regions = match self.target_region.is_empty() {
      true => ec2::get_regions(&crate::get_client(&config, None, self.retries)).await?,
      false => self.target_region.to_owned(),
    };
    info!("Collecting images for {} regions", regions.len());

    let query = &self.image_query();
    let config = &config;
    let retries = self.retries;
    let region_map = mapping::assemble(regions, move |region| async move {
      // Images are regional, so each region is queried through its own client
      let client = &crate::get_client(config, Some(Region::new(region.to_owned())), retries);
      mapping::resolve_image(&region, move |arch| ec2::get_images(client, query, arch)).await
    })
    .await?;

    let rendered = output::render(&Template::from(region_map), self.format)?;
    output::write(&rendered, self.output.as_ref())
  }
}
