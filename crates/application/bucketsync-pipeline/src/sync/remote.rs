use bucketsync_core::path_utils::BucketPath;
use bucketsync_core::RemoteObject;
use bucketsync_infra::ObjectStore;
use futures::TryStreamExt;
use tracing::debug;

use crate::sync::SyncError;

/// Drain a listing into memory. Any listing error aborts the whole inventory.
pub async fn list_remote(
    store: &dyn ObjectStore,
    listing_prefix: &str,
) -> Result<Vec<RemoteObject>, SyncError> {
    let objects: Vec<RemoteObject> = store
        .list(listing_prefix)
        .try_filter(|obj| futures::future::ready(!BucketPath::is_placeholder(&obj.key)))
        .try_collect()
        .await?;

    debug!(
        "remote inventory under '{listing_prefix}': {} objects",
        objects.len()
    );
    Ok(objects)
}
