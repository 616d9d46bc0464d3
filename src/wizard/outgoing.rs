//! Outgoing links of choosables, with click counting.

use tracing::info;

use super::model::ChoosableId;
use crate::error::{Error, RouteError};
use crate::store::WizardStore;

/// Resolve the link stored under `property` for a choosable and count the click.
///
/// The property key is matched case-insensitively.
pub async fn route_outgoing(
    store: &dyn WizardStore,
    id: ChoosableId,
    property: &str,
) -> Result<String, Error> {
    let choosable = store
        .get_choosable(id)
        .await?
        .ok_or_else(|| RouteError::not_found("Choosable", id.to_string()))?;

    let key = property.to_uppercase();
    let meta = choosable
        .meta
        .get(&key)
        .ok_or_else(|| RouteError::not_found("Choosable property", format!("{id}/{key}")))?;

    let clicked = store.increment_clicks(id).await?;
    info!(choosable_id = id, property = %key, clicked, "Outgoing link followed");

    Ok(meta.meta_value.clone())
}
