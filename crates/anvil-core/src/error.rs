use std::fmt;

/// Core error taxonomy shared by the ECS, job system and event pipeline.
///
/// `PlatformFailure` and `ScriptError` only ever surface at the shell
/// boundary (the core itself never produces them); they are kept here so
/// callers can match on a single type end-to-end.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// A fixed-capacity structure is saturated.
    OutOfSpace,
    /// A handle's generation no longer matches the slot it points at.
    InvalidHandle,
    /// `add` was called on an entity that already carries the component.
    ComponentExists,
    /// `set`/`get`/`remove` was called on an entity missing the component.
    ComponentMissing,
    /// The platform backend failed to open a window/surface.
    PlatformFailure,
    /// A script callback raised an error; the core state remains consistent.
    ScriptError,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::OutOfSpace => "fixed-capacity structure is full",
            Error::InvalidHandle => "handle generation mismatch",
            Error::ComponentExists => "component already present on entity",
            Error::ComponentMissing => "component not present on entity",
            Error::PlatformFailure => "platform backend failure",
            Error::ScriptError => "script callback error",
        };
        write!(f, "{}", msg)
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
