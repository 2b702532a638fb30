use std::time::Duration;

use clap::Parser;
use kube::CustomResourceExt;
use rand::{SeedableRng, rngs::StdRng};
use snafu::{ResultExt, Snafu};
use stackable_cloudscale_operator::{
    binding::ClaimBinder,
    cli::{Command, Opts},
    client::Client,
    controller::{self, Ctx, OPERATOR_NAME},
    crd::{Bucket, Provider, S3Bucket, S3BucketClass},
    logging::initialize_logging,
    managed::{ManagedReconciler, bucket::BucketConnecter},
};

const APP_NAME: &str = "cloudscale-operator";
const LOG_ENV: &str = "CLOUDSCALE_OPERATOR_LOG";

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to serialize CustomResourceDefinition"))]
    SerializeCrd { source: serde_yaml::Error },

    #[snafu(display("failed to initialize logging"))]
    InitializeLogging {
        source: tracing_appender::rolling::InitError,
    },

    #[snafu(display("failed to create Kubernetes client"))]
    CreateClient { source: kube::Error },
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let opts = Opts::parse();
    match opts.cmd {
        Command::Crd => {
            for crd in [
                Bucket::crd(),
                S3Bucket::crd(),
                S3BucketClass::crd(),
                Provider::crd(),
            ] {
                print!("---\n{}", serde_yaml::to_string(&crd).context(SerializeCrdSnafu)?);
            }
        }
        Command::Run(args) => {
            initialize_logging(LOG_ENV, APP_NAME).context(InitializeLoggingSnafu)?;
            tracing::info!(
                version = env!("CARGO_PKG_VERSION"),
                watch_namespace = ?args.watch_namespace,
                api_url = %args.cloudscale_api_url,
                "starting {APP_NAME}"
            );

            let client = Client::new(
                kube::Client::try_default()
                    .await
                    .context(CreateClientSnafu)?,
                OPERATOR_NAME,
            );
            let requeue_after = Duration::from_secs(args.requeue_seconds);

            let binder = ClaimBinder::new(
                client.clone(),
                StdRng::from_os_rng(),
                requeue_after,
                tracing::info_span!("binding"),
            );
            let connecter = BucketConnecter::new(
                client.clone(),
                reqwest::Client::new(),
                args.cloudscale_api_url,
                tracing::info_span!("cloudscale"),
            );
            let buckets = ManagedReconciler::new(
                client.clone(),
                connecter,
                requeue_after,
                tracing::info_span!("managed"),
            );

            controller::run(client, &args.watch_namespace, Ctx::new(binder, buckets)).await;
        }
    }
    Ok(())
}
