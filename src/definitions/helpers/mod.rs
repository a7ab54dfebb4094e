pub mod non_empty_vec;
pub mod ordered_map;
pub mod tag24;

pub use non_empty_vec::NonEmptyVec;
pub use ordered_map::OrderedMap;
pub use tag24::Tag24;
