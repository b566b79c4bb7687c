mod github;

pub use github::{
    categorize_assets, AssetKind, CategorizedAsset, ReleaseAsset, ReleaseAssets, ReleaseUpdater,
    UpdateCheck, VersionMarker,
};
