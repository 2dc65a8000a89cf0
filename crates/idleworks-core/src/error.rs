/// Invalid static configuration, detected when a component is added or
/// activated. A component that fails activation stays inactive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A handle the component depends on does not resolve.
    #[error("{component} is missing required reference: {reference}")]
    MissingReference {
        component: &'static str,
        reference: &'static str,
    },

    #[error("{component} must have a capacity of at least 1")]
    ZeroCapacity { component: &'static str },

    #[error("{component} interval must be at least one tick")]
    ZeroInterval { component: &'static str },

    /// The component handle passed to an activation call does not exist.
    #[error("no such {component}")]
    UnknownComponent { component: &'static str },
}
