//! # CRD Generator
//!
//! Prints the `MultiClusterEngine` CustomResourceDefinition as YAML.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/multiclusterengine.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use backplane_operator::crd::MultiClusterEngine;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&MultiClusterEngine::crd())?);
    Ok(())
}
