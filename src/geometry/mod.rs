pub mod curve;
pub mod frame;
pub mod surface;

pub use curve::{Arc, Curve, CurveDomain, Line};
pub use frame::Frame;
pub use surface::{Cylinder, Plane, Surface};
