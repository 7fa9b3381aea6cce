mod asset;
mod association;
mod id;

pub use asset::{Asset, AssetKind};
pub use association::AssociationPeriod;
pub use id::{Id, IdError};
