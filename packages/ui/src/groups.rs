//! Group lists as the screens display them.
//!
//! Every list merges the user's groups with the locally featured ids through
//! [`store::order_groups`]. A failed fetch shows an empty list rather than an
//! error or stale data.

use api::models::NewGroup;
use api::{Backend, GroupCache, HomeeApi};
use store::{order_groups, FeaturedGroups, Group, KeyValueStore};

use crate::error::FlowError;

/// Fetch the user's groups and order them for display.
pub async fn load_display_groups<B: Backend, S: KeyValueStore>(
    api: &HomeeApi<B>,
    cache: &GroupCache,
    featured: &FeaturedGroups<S>,
    user_id: &str,
) -> Vec<Group> {
    match cache.groups_for_user(api, user_id).await {
        Ok(groups) => order_groups(groups, &featured.featured_group_ids()),
        Err(e) => {
            tracing::error!("Failed to load groups for {}: {}", user_id, e);
            Vec::new()
        }
    }
}

/// Feature `group_id` if it is not featured, otherwise unfeature it.
/// Returns whether the group is featured afterwards.
pub async fn toggle_featured<S: KeyValueStore>(
    featured: &FeaturedGroups<S>,
    group_id: &str,
) -> Result<bool, FlowError> {
    if featured.is_featured(group_id) {
        featured.remove_featured_group(group_id).await?;
        Ok(false)
    } else {
        Ok(featured.add_featured_group(group_id).await?)
    }
}

pub async fn create_group<B: Backend>(
    api: &HomeeApi<B>,
    cache: &GroupCache,
    group: &NewGroup,
) -> Result<Group, FlowError> {
    let created = api.create_group(group).await?;
    cache.invalidate(&group.creator_id).await;
    Ok(created)
}

pub async fn join_group<B: Backend>(
    api: &HomeeApi<B>,
    cache: &GroupCache,
    group_id: &str,
    user_id: &str,
) -> Result<(), FlowError> {
    api.join_group(group_id, user_id).await?;
    cache.invalidate(user_id).await;
    Ok(())
}

/// Leave a group. It is also dropped from the featured list, since a group
/// the user no longer belongs to can never be displayed.
pub async fn leave_group<B: Backend, S: KeyValueStore>(
    api: &HomeeApi<B>,
    cache: &GroupCache,
    featured: &FeaturedGroups<S>,
    group_id: &str,
    user_id: &str,
) -> Result<(), FlowError> {
    api.leave_group(group_id, user_id).await?;
    cache.invalidate(user_id).await;
    featured.remove_featured_group(group_id).await?;
    Ok(())
}
