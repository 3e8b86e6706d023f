// ABOUTME: Site profile resolution: which selectors and navigation hints apply to a URL.
// ABOUTME: Re-exports the profile data model and the immutable registry.

pub mod profile;
pub mod registry;

pub use profile::{SelectorSet, SelectorSpec, SiteProfile};
pub use registry::{RegistryError, SiteRegistry};
