//! # Runtime Property Updates
//!
//! Publishes connection configuration and volumes on the Infra status.

use crate::crd::{Infra, InfraVolume, RuntimeFlavor, RuntimeProperties};

/// Upsert the runtime properties of one flavor
pub fn set_runtime_properties(infra: &mut Infra, flavor: RuntimeFlavor, props: RuntimeProperties) {
    infra
        .status
        .get_or_insert_with(Default::default)
        .runtime_properties
        .get_or_insert_with(Default::default)
        .insert(flavor.as_str().to_string(), props);
}

/// Replace the volumes application pods must mount
pub fn set_volumes(infra: &mut Infra, volumes: Vec<InfraVolume>) {
    infra.status.get_or_insert_with(Default::default).volumes = volumes;
}
