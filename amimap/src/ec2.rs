use std::fmt;

use anyhow::{Context, Result};
use aws_sdk_ec2::{types::Filter, Client};
use tracing::debug;

/// Default name pattern used to find Amazon Linux 2 images
pub static DEFAULT_NAME_PATTERN: &str = "amzn2-ami-hvm-*";

/// Default owner alias for the images
pub static DEFAULT_OWNER_ALIAS: &str = "amazon";

/// CPU architectures supported in the mapping
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Architecture {
  Arm64,
  X8664,
}

impl Architecture {
  /// Order in which architectures are searched; the first with any candidates wins
  pub const PREFERENCE: [Architecture; 2] = [Architecture::Arm64, Architecture::X8664];

  /// The value used by the EC2 `architecture` filter
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Arm64 => "arm64",
      Self::X8664 => "x86_64",
    }
  }

  /// The burstable instance family that is compatible with the architecture
  pub fn instance_family(&self) -> &'static str {
    match self {
      Self::Arm64 => "t4g",
      Self::X8664 => "t3",
    }
  }
}

impl fmt::Display for Architecture {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// An image returned by `DescribeImages`, reduced to what is needed for selection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
  /// The ID of the AMI
  pub image_id: String,

  /// The date and time the image was created (ISO 8601)
  ///
  /// The format is fixed width, so comparing as strings orders by recency
  pub creation_date: String,

  /// The name of the AMI
  pub name: Option<String>,
}

impl Image {
  /// Images without an ID or creation date cannot be mapped or ranked
  fn from_sdk(image: aws_sdk_ec2::types::Image) -> Option<Self> {
    Some(Image {
      image_id: image.image_id?,
      creation_date: image.creation_date?,
      name: image.name,
    })
  }
}

/// The filters applied when searching for image candidates
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageQuery {
  /// Wildcard pattern matched against the image name
  pub name: String,

  /// Owner alias of the images (i.e. - `amazon`)
  pub owner_alias: String,
}

impl Default for ImageQuery {
  fn default() -> Self {
    ImageQuery {
      name: DEFAULT_NAME_PATTERN.to_string(),
      owner_alias: DEFAULT_OWNER_ALIAS.to_string(),
    }
  }
}

impl ImageQuery {
  /// Filters for available, EBS backed HVM machine images of the given architecture
  pub fn filters(&self, arch: Architecture) -> Vec<Filter> {
    vec![
      ("virtualization-type", "hvm"),
      ("architecture", arch.as_str()),
      ("state", "available"),
      ("root-device-type", "ebs"),
      ("image-type", "machine"),
      ("owner-alias", self.owner_alias.as_str()),
      ("name", self.name.as_str()),
    ]
    .into_iter()
    .map(|(name, value)| Filter::builder().name(name).values(value).build())
    .collect()
  }
}

/// Get the names of the regions enabled for the account
pub async fn get_regions(client: &Client) -> Result<Vec<String>> {
  let output = client
    .describe_regions()
    .send()
    .await
    .context("Failed to describe regions")?;

  let regions = output
    .regions
    .unwrap_or_default()
    .into_iter()
    .filter_map(|region| region.region_name)
    .collect::<Vec<_>>();
  debug!("Found {} regions", regions.len());

  Ok(regions)
}

/// Get the images matching the query for the architecture, in the order returned by EC2
pub async fn get_images(client: &Client, query: &ImageQuery, arch: Architecture) -> Result<Vec<Image>> {
  let output = client
    .describe_images()
    .set_filters(Some(query.filters(arch)))
    .send()
    .await?;

  let images = output
    .images
    .unwrap_or_default()
    .into_iter()
    .filter_map(Image::from_sdk)
    .collect::<Vec<_>>();

  Ok(images)
}
