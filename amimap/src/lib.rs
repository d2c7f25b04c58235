pub mod cli;
pub mod ec2;
pub mod mapping;
pub mod output;

use anyhow::Result;
use aws_config::{meta::region::RegionProviderChain, SdkConfig};
use aws_sdk_ec2::{
  config::{self, retry::RetryConfig},
  Client,
};
use aws_types::region::Region;
pub use cli::Cli;

/// Get the configuration to authn/authz with AWS that will be used across AWS clients
pub async fn get_sdk_config(region: Option<String>) -> Result<SdkConfig> {
  let region_provider = RegionProviderChain::first_try(region.map(Region::new)).or_default_provider();

  Ok(aws_config::from_env().region(region_provider).load().await)
}

/// Construct and return the EC2 client
///
/// The region of the shared configuration is replaced when one is provided
pub fn get_client(config: &SdkConfig, region: Option<Region>, retries: u32) -> Client {
  let mut builder = config::Builder::from(config).retry_config(RetryConfig::standard().with_max_attempts(retries));
  if let Some(region) = region {
    builder = builder.region(region);
  }

  Client::from_conf(builder.build())
}
