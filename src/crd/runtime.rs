//! # Runtime Flavors
//!
//! Application runtimes the controller publishes connection configuration for.

/// Application-runtime flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuntimeFlavor {
    Quarkus,
    SpringBoot,
}

impl RuntimeFlavor {
    /// Every flavor, in publication order
    pub const ALL: [Self; 2] = [Self::Quarkus, Self::SpringBoot];

    /// Key used in `status.runtimeProperties`
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quarkus => "quarkus",
            Self::SpringBoot => "springboot",
        }
    }
}

impl std::fmt::Display for RuntimeFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
