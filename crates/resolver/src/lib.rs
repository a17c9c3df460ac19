//! Order-line readiness resolution.
//!
//! Maps order SKUs to stock SKUs, decomposes kits per location, checks
//! component and supply availability, and reduces everything to the
//! single status that drives downstream stock decrementing.

pub mod composition;
pub mod resolver;
pub mod result;

pub use composition::{ComponentCheck, ComponentShortfall, CompositionResolver};
pub use resolver::{ReadinessResolver, ResolverConfig};
pub use result::{BatchResolution, LineFailure, ResolutionResult};
