use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::model::event::{EVENT_COLUMNS, Event};

/// Calendar listings keyed by nothing but the calendar itself; one entry.
static EVENTS_CACHE: Lazy<Cache<(), Arc<Vec<Event>>>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(1)
        .time_to_live(Duration::from_secs(300)) // 5 min TTL
        .build()
});

/// Bumped by every invalidation. A load that started under an older
/// generation may have read rows from before the write and is not kept.
static GENERATION: AtomicU64 = AtomicU64::new(0);

/// All events ordered by start date, loaded from the database on a miss.
pub async fn cached_events(pool: &MySqlPool) -> Result<Arc<Vec<Event>>, sqlx::Error> {
    if let Some(events) = EVENTS_CACHE.get(&()).await {
        return Ok(events);
    }

    let generation = GENERATION.load(Ordering::SeqCst);
    let events = sqlx::query_as::<_, Event>(&format!(
        "SELECT {EVENT_COLUMNS} FROM events ORDER BY start_date ASC, id ASC"
    ))
    .fetch_all(pool)
    .await?;
    let events = Arc::new(events);

    if store_if_current(generation, events.clone()).await {
        tracing::debug!(count = events.len(), "Events cache refreshed");
    }
    Ok(events)
}

/// Caches a listing loaded under `generation` unless an invalidation has
/// happened since. Returns whether the listing was kept.
async fn store_if_current(generation: u64, events: Arc<Vec<Event>>) -> bool {
    if GENERATION.load(Ordering::SeqCst) != generation {
        return false;
    }
    EVENTS_CACHE.insert((), events).await;

    // An invalidation may have slipped in between the check and the insert.
    if GENERATION.load(Ordering::SeqCst) != generation {
        EVENTS_CACHE.invalidate(&()).await;
        return false;
    }
    true
}

/// Drop the cached listing after any write to `events`.
pub async fn invalidate() {
    GENERATION.fetch_add(1, Ordering::SeqCst);
    EVENTS_CACHE.invalidate(&()).await;
}

#[cfg(test)]
fn is_cached() -> bool {
    EVENTS_CACHE.contains_key(&())
}
