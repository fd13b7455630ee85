// [tests/mirror/libs/infra/model_cache/eviction_integrity.test.rs]
/**
 * =================================================================
 * APARATO: SESSION CACHE CERTIFIER (V4.3 - EVICTION PROOF)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L3-ARSENAL)
 * RESPONSABILIDAD: CERTIFICACIÓN DE EVICCIÓN LRU Y CARGA SINGLE-FLIGHT
 *
 * # Logic:
 * El núcleo genérico 'SessionCache<S>' se certifica con sesiones u32
 * sintéticas; la política es idéntica a la del arsenal ONNX real.
 * =================================================================
 */

use intellioptics_infra_model_cache::cache::{ModelRole, SessionCache};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn key_of(detector: &str) -> (String, ModelRole) {
    (detector.to_string(), ModelRole::Primary)
}

/**
 * CERTIFICACIÓN: escenario canónico — capacidad 2, cargar A, B, C con
 * acceso igualitario → A desalojada, B y C residentes.
 */
#[tokio::test]
async fn certify_canonical_eviction_order() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating canonical eviction (A, B, C)...");

    let cache: SessionCache<u32> = SessionCache::new(2);

    cache.put(key_of("detector-a"), 1).await;
    cache.put(key_of("detector-b"), 2).await;
    // A y B con frecuencia 1; la inserción de C desaloja la mínima más antigua.
    cache.put(key_of("detector-c"), 3).await;

    assert_eq!(cache.len().await, 2, "Capacity seal violated.");
    assert!(!cache.contains(&key_of("detector-a")).await, "A must be evicted.");
    assert!(cache.contains(&key_of("detector-b")).await, "B must survive.");
    assert!(cache.contains(&key_of("detector-c")).await, "C must survive.");

    println!("   ✅ Eviction: A evicted, B and C resident.");
}

/**
 * CERTIFICACIÓN: la frecuencia de acceso protege de la evicción.
 */
#[tokio::test]
async fn certify_frequency_protects_residents() {
    let cache: SessionCache<u32> = SessionCache::new(2);

    cache.put(key_of("hot"), 1).await;
    cache.put(key_of("cold"), 2).await;

    // Calentamos 'hot': su frecuencia supera a la de 'cold'.
    for _ in 0..5 {
        assert!(cache.get(&key_of("hot")).await.is_some());
    }

    cache.put(key_of("newcomer"), 3).await;

    assert!(cache.contains(&key_of("hot")).await, "The hot session must survive.");
    assert!(!cache.contains(&key_of("cold")).await, "The cold session must be evicted.");
}

/**
 * CERTIFICACIÓN: los roles separan el espacio de llaves de un detector.
 */
#[tokio::test]
async fn certify_role_separated_keyspace() {
    let cache: SessionCache<u32> = SessionCache::new(4);

    cache.put(("detector-a".to_string(), ModelRole::Primary), 1).await;
    cache.put(("detector-a".to_string(), ModelRole::Oodd), 2).await;

    let primary = cache.get(&("detector-a".to_string(), ModelRole::Primary)).await;
    let oodd = cache.get(&("detector-a".to_string(), ModelRole::Oodd)).await;

    assert_eq!(primary.as_deref(), Some(&1));
    assert_eq!(oodd.as_deref(), Some(&2));
}

/**
 * CERTIFICACIÓN: carga single-flight — N solicitantes concurrentes de
 * la misma llave producen exactamente una invocación del cargador.
 */
#[tokio::test]
async fn certify_single_flight_loading() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating single-flight discipline...");

    let cache: Arc<SessionCache<u64>> = Arc::new(SessionCache::new(4));
    let loader_invocations = Arc::new(AtomicUsize::new(0));

    let mut concurrent_requests = Vec::new();
    for _ in 0..8 {
        let cache_handle = Arc::clone(&cache);
        let invocation_counter = Arc::clone(&loader_invocations);

        concurrent_requests.push(tokio::spawn(async move {
            cache_handle
                .get_or_load(key_of("detector-shared"), || async move {
                    invocation_counter.fetch_add(1, Ordering::SeqCst);
                    // Latencia artificial: amplifica la ventana de carrera.
                    tokio::time::sleep(std::time::Duration::from_millis(25)).await;
                    Ok::<u64, std::convert::Infallible>(42)
                })
                .await
        }));
    }

    for request in concurrent_requests {
        let session = request.await.expect("task join").expect("load resolves");
        assert_eq!(*session, 42);
    }

    assert_eq!(
        loader_invocations.load(Ordering::SeqCst),
        1,
        "SINGLE_FLIGHT_VIOLATION: the loader ran more than once for one key."
    );

    println!("   ✅ Single flight: 8 requesters, 1 load.");
}

/**
 * CERTIFICACIÓN: el Arc del tenedor sobrevive a la evicción.
 */
#[tokio::test]
async fn certify_holder_survives_eviction() {
    let cache: SessionCache<u32> = SessionCache::new(1);

    let held_session = cache.put(key_of("short-lived"), 7).await;
    cache.put(key_of("usurper"), 8).await;

    assert!(!cache.contains(&key_of("short-lived")).await);
    // El tenedor conserva la sesión viva a través del Arc.
    assert_eq!(*held_session, 7);
}
