pub mod registry;
pub mod transform;

pub use registry::{IndicatorMeta, IndicatorSpec, Registry, SourceKind, UnitType};
pub use transform::Transform;
