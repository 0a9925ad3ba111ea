//! # Custom Resource Definitions
//!
//! CRD types for the Infra Binding Controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - Infra specification and backing resource reference
//! - `status.rs` - Condition, runtime properties and volumes published on the status
//! - `runtime.rs` - Application-runtime flavors

mod runtime;
mod spec;
mod status;

pub use runtime::RuntimeFlavor;
pub use spec::{Infra, InfraSpec, ResourceRef};
pub use status::{
    EnvVarSource, EnvVarSpec, InfraCondition, InfraConditionReason, InfraConditionType,
    InfraStatus, InfraVolume, KeyToPath, NamedSecretVolume, RuntimeProperties, SecretKeyRef,
    SecretVolumeSource, VolumeMountSpec,
};
