use std::{collections::BTreeMap, future::Future};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ec2::{Architecture, Image};

/// The image selected for a region
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionImage {
  /// The ID of the newest matching AMI
  #[serde(rename = "AMI")]
  pub ami: String,

  /// The instance family compatible with the AMI architecture
  #[serde(rename = "type")]
  pub instance_type: String,
}

impl RegionImage {
  pub fn new(image: Image, arch: Architecture) -> Self {
    RegionImage {
      ami: image.image_id,
      instance_type: arch.instance_family().to_string(),
    }
  }
}

/// Region name to selected image
pub type RegionMap = BTreeMap<String, RegionImage>;

/// Document root, shaped to be pasted into the `Mappings` section of a CloudFormation template
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
  #[serde(rename = "Mappings")]
  pub mappings: Mappings,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mappings {
  #[serde(rename = "AWSAMIRegionMap")]
  pub region_map: RegionMap,
}

impl From<RegionMap> for Template {
  fn from(region_map: RegionMap) -> Self {
    Template {
      mappings: Mappings { region_map },
    }
  }
}

/// Select the image with the latest creation date
///
/// When several images share the latest creation date, the first one is kept
pub fn latest_image(candidates: Vec<Image>) -> Option<Image> {
  candidates
    .into_iter()
    .reduce(|latest, image| match image.creation_date > latest.creation_date {
      true => image,
      false => latest,
    })
}

/// Find the newest image for a region, searching each architecture in order of preference
///
/// `lookup` returns the candidates for an architecture; it is only called for the fallback
/// architecture when the preferred one has no candidates
pub async fn resolve_image<F, Fut>(region: &str, mut lookup: F) -> Result<Option<RegionImage>>
where
  F: FnMut(Architecture) -> Fut,
  Fut: Future<Output = Result<Vec<Image>>>,
{
  for arch in Architecture::PREFERENCE {
    let candidates = lookup(arch)
      .await
      .with_context(|| format!("Failed to describe {arch} images in {region}"))?;
    debug!("Found {} {arch} candidates in {region}", candidates.len());

    if let Some(image) = latest_image(candidates) {
      return Ok(Some(RegionImage::new(image, arch)));
    }
  }

  Ok(None)
}

/// Resolve the image of every region in turn and collect the results
///
/// Regions without any matching image are left out of the map
pub async fn assemble<F, Fut>(regions: Vec<String>, mut resolve: F) -> Result<RegionMap>
where
  F: FnMut(String) -> Fut,
  Fut: Future<Output = Result<Option<RegionImage>>>,
{
  let mut region_map = RegionMap::new();

  for region in regions {
    info!("{region}");
    match resolve(region.clone()).await? {
      Some(image) => {
        debug!("Selected {} ({}) in {region}", image.ami, image.instance_type);
        region_map.insert(region, image);
      }
      None => warn!("No matching image found in {region}, skipping"),
    }
  }

  Ok(region_map)
}

#[cfg(test)]
mod tests {
  use std::future::ready;

  use anyhow::anyhow;

  use super::*;

  fn image(id: &str, created: &str) -> Image {
    Image {
      image_id: id.to_string(),
      creation_date: created.to_string(),
      name: None,
    }
  }

  fn region_image(ami: &str, instance_type: &str) -> RegionImage {
    RegionImage {
      ami: ami.to_string(),
      instance_type: instance_type.to_string(),
    }
  }

  #[test]
  fn it_selects_latest_image() {
    let candidates = vec![
      image("ami-1", "2023-01-02T00:00:00.000Z"),
      image("ami-2", "2023-03-15T00:00:00.000Z"),
      image("ami-3", "2022-12-31T00:00:00.000Z"),
    ];

    assert_eq!(latest_image(candidates).unwrap().image_id, "ami-2");
  }

  #[test]
  fn it_keeps_first_of_equal_dates() {
    let candidates = vec![
      image("ami-1", "2023-01-01T00:00:00.000Z"),
      image("ami-2", "2023-02-01T00:00:00.000Z"),
      image("ami-3", "2023-02-01T00:00:00.000Z"),
    ];

    assert_eq!(latest_image(candidates).unwrap().image_id, "ami-2");
  }

  #[test]
  fn it_selects_nothing_from_empty() {
    assert_eq!(latest_image(vec![]), None);
  }

  #[tokio::test]
  async fn it_prefers_arm64() {
    let mut calls = Vec::new();
    let result = resolve_image("us-east-1", |arch| {
      calls.push(arch);
      ready(Ok(vec![
        image("ami-old", "2023-01-01T00:00:00.000Z"),
        image("ami-new", "2023-01-02T00:00:00.000Z"),
      ]))
    })
    .await
    .unwrap();

    assert_eq!(result, Some(region_image("ami-new", "t4g")));
    assert_eq!(calls, vec![Architecture::Arm64]);
  }

  #[tokio::test]
  async fn it_falls_back_to_x86_64() {
    let mut calls = Vec::new();
    let result = resolve_image("us-west-2", |arch| {
      calls.push(arch);
      ready(Ok(match arch {
        Architecture::Arm64 => vec![],
        Architecture::X8664 => vec![image("ami-x86", "2023-01-01T00:00:00.000Z")],
      }))
    })
    .await
    .unwrap();

    assert_eq!(result, Some(region_image("ami-x86", "t3")));
    assert_eq!(calls, vec![Architecture::Arm64, Architecture::X8664]);
  }

  #[tokio::test]
  async fn it_resolves_nothing_without_candidates() {
    let result = resolve_image("af-south-1", |_| ready(Ok(vec![]))).await.unwrap();

    assert_eq!(result, None);
  }

  #[tokio::test]
  async fn it_propagates_lookup_errors() {
    let result = resolve_image("eu-west-1", |_| ready(Err(anyhow!("AuthFailure")))).await;

    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "Failed to describe arm64 images in eu-west-1");
    assert_eq!(err.root_cause().to_string(), "AuthFailure");
  }

  #[tokio::test]
  async fn it_assembles_region_map() {
    let regions = vec!["us-east-1".to_string(), "us-west-2".to_string(), "me-south-1".to_string()];

    let result = assemble(regions, |region| async move {
      resolve_image(&region, |arch| {
        let candidates = match (region.as_str(), arch) {
          ("us-east-1", Architecture::Arm64) => vec![image("ami-1", "2023-01-02")],
          ("us-west-2", Architecture::X8664) => vec![image("ami-2", "2023-01-01")],
          _ => vec![],
        };
        ready(Ok(candidates))
      })
      .await
    })
    .await
    .unwrap();

    let expected = RegionMap::from([
      ("us-east-1".to_string(), region_image("ami-1", "t4g")),
      ("us-west-2".to_string(), region_image("ami-2", "t3")),
    ]);
    assert_eq!(result, expected);
  }

  #[tokio::test]
  async fn it_assembles_empty_region_list() {
    let result = assemble(vec![], |_| ready(Ok(Some(region_image("ami-1", "t4g")))))
      .await
      .unwrap();

    assert!(result.is_empty());
  }

  #[tokio::test]
  async fn it_stops_on_first_error() {
    let mut visited = Vec::new();
    let regions = vec!["us-east-1".to_string(), "us-east-2".to_string(), "us-west-1".to_string()];

    let result = assemble(regions, |region| {
      visited.push(region.clone());
      ready(match region.as_str() {
        "us-east-2" => Err(anyhow!("RequestExpired")),
        _ => Ok(None),
      })
    })
    .await;

    assert!(result.is_err());
    assert_eq!(visited, vec!["us-east-1", "us-east-2"]);
  }

  #[test]
  fn it_wraps_region_map() {
    let region_map = RegionMap::from([("us-east-1".to_string(), region_image("ami-1", "t4g"))]);
    let template = Template::from(region_map.clone());

    assert_eq!(template.mappings.region_map, region_map);
  }
}
