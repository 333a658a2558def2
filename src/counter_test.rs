use super::*;

#[test]
fn room_count_key_format() {
    assert_eq!(room_count_key(42), "CHAT_ROOM_USER_COUNT_42");
}

#[tokio::test]
async fn missing_key_reads_as_zero() {
    let store = MemoryCounterStore::new();
    assert_eq!(store.get(1).await.unwrap(), 0);
}

#[tokio::test]
async fn increment_from_absent_starts_at_one() {
    let store = MemoryCounterStore::new();
    assert_eq!(store.increment(1).await.unwrap(), 1);
    assert_eq!(store.increment(1).await.unwrap(), 2);
    assert_eq!(store.get(1).await.unwrap(), 2);
}

#[tokio::test]
async fn decrement_subtracts_exactly_one() {
    let store = MemoryCounterStore::new();
    store.increment(5).await.unwrap();
    store.increment(5).await.unwrap();
    assert_eq!(store.decrement(5).await.unwrap(), 1);
    assert_eq!(store.get(5).await.unwrap(), 1);
}

#[tokio::test]
async fn decrement_clamps_at_zero() {
    let store = MemoryCounterStore::new();
    assert_eq!(store.decrement(9).await.unwrap(), 0);
    assert_eq!(store.get(9).await.unwrap(), 0);
}

#[tokio::test]
async fn rooms_are_independent() {
    let store = MemoryCounterStore::new();
    store.increment(1).await.unwrap();
    assert_eq!(store.get(2).await.unwrap(), 0);
}

#[tokio::test]
async fn concurrent_increments_are_not_lost() {
    let store = MemoryCounterStore::new();
    let mut handles = Vec::new();
    for _ in 0..50 {
        let store = store.clone();
        handles.push(tokio::spawn(async move { store.increment(3).await.unwrap() }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(store.get(3).await.unwrap(), 50);
}

#[test]
fn counter_error_maps_to_service_unavailable() {
    use crate::response::ErrorCode;
    let err = CounterError::Store(redis::RedisError::from((redis::ErrorKind::IoError, "refused")));
    assert_eq!(err.status(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(err.error_code(), "E_COUNTER_STORE");
}
