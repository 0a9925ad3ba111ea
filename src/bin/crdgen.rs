//! # CRD Generator
//!
//! Prints the `Infra` CustomResourceDefinition as YAML.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/infra.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use infra_binding_controller::crd::Infra;
use kube::core::CustomResourceExt;

fn main() {
    match serde_yaml::to_string(&Infra::crd()) {
        Ok(yaml) => {
            println!("# This file is auto-generated by crdgen");
            println!("# DO NOT EDIT THIS FILE MANUALLY");
            println!("---");
            print!("{yaml}");
        }
        Err(e) => {
            eprintln!("Failed to serialize CRD: {e}");
            std::process::exit(1);
        }
    }
}
