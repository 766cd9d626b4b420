//! Tests for tokio spawner utilities

use prometheus_sync_kit::core::Spawn;
use prometheus_sync_kit::runtime::TokioSpawner;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send(123).unwrap();
    });

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[test]
fn test_spawner_built_from_runtime_handle() {
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let spawner = TokioSpawner::new(runtime.handle().clone());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send("from outside").unwrap();
    });
    assert_eq!(runtime.block_on(rx).unwrap(), "from outside");
}
