mod asset_index;
mod libraries;

pub use asset_index::{AssetEntry, AssetIndex, AssetObject};
pub use libraries::{LibraryAssetSynchronizer, SyncReport};
