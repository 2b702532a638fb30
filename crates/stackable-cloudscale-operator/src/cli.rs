use clap::Parser;
use url::Url;

use crate::{cloudscale::DEFAULT_API_URL, namespace::WatchNamespace};

pub const AUTHOR: &str = "Stackable GmbH - info@stackable.tech";

#[derive(Debug, Parser)]
#[command(author = AUTHOR, version, about = "Provisions buckets on cloudscale object storage")]
pub struct Opts {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, PartialEq, Eq, clap::Subcommand)]
pub enum Command {
    /// Print the CustomResourceDefinitions of this operator as YAML.
    Crd,

    /// Run the operator.
    Run(RunArguments),
}

#[derive(Debug, PartialEq, Eq, clap::Args)]
pub struct RunArguments {
    /// Only watch claims and buckets in this namespace. Watches all namespaces if empty.
    #[arg(long, env, default_value = "")]
    pub watch_namespace: WatchNamespace,

    /// Base URL of the cloudscale REST API.
    #[arg(long, env, default_value = DEFAULT_API_URL)]
    pub cloudscale_api_url: Url,

    /// Interval in seconds in which synced buckets are observed again.
    #[arg(long, env, default_value_t = 60)]
    pub requeue_seconds: u64,
}
