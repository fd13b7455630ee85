// [tests/mirror/libs/infra/queue/delivery_integrity.test.rs]
/**
 * =================================================================
 * APARATO: QUEUE DELIVERY CERTIFIER (V3.3 - AT-LEAST-ONCE PROOF)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L3-QUEUE)
 * RESPONSABILIDAD: CERTIFICACIÓN DE ARRENDAMIENTO, REDELIVERY Y DEAD-LETTER
 * =================================================================
 */

use intellioptics_infra_queue::QueueBroker;
use serde_json::json;

async fn forge_broker() -> QueueBroker {
    QueueBroker::connect(":memory:", None).await.expect("memory broker must ignite")
}

/**
 * CERTIFICACIÓN: enqueue → receive → complete drena la cola.
 */
#[tokio::test]
async fn certify_nominal_delivery() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating nominal delivery...");

    let broker = forge_broker().await;

    broker
        .enqueue("image-queries", &json!({"image_query_id": "iq-1", "blob_url": "http://v/c/n.jpg"}))
        .await
        .expect("enqueue must succeed");
    assert_eq!(broker.pending_depth("image-queries").await.unwrap(), 1);

    let leased_batch = broker.receive_batch("image-queries", 10, 60).await.expect("receive resolves");
    assert_eq!(leased_batch.len(), 1);
    assert_eq!(leased_batch[0].delivery_count, 1);

    broker.complete(&leased_batch[0]).await.expect("completion must succeed");
    assert_eq!(broker.pending_depth("image-queries").await.unwrap(), 0);

    let drained = broker.receive_batch("image-queries", 10, 60).await.expect("receive resolves");
    assert!(drained.is_empty(), "A completed message must never redeliver.");

    println!("   ✅ Nominal delivery: leased once, completed once.");
}

/**
 * CERTIFICACIÓN: un arrendamiento vivo excluye a receptores concurrentes;
 * el abandono rehabilita el mensaje (at-least-once).
 */
#[tokio::test]
async fn certify_lease_exclusivity_and_abandon() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating lease exclusivity...");

    let broker = forge_broker().await;
    broker.enqueue("escalations", &json!({"query_id": "q-1"})).await.expect("enqueue");

    // 1. PRIMER RECEPTOR: arrendamiento exclusivo.
    let first_lease = broker.receive_batch("escalations", 10, 60).await.expect("receive");
    assert_eq!(first_lease.len(), 1);

    // 2. RECEPTOR CONCURRENTE: el mensaje está oculto por la visibilidad.
    let concurrent_attempt = broker.receive_batch("escalations", 10, 60).await.expect("receive");
    assert!(concurrent_attempt.is_empty(), "A live lease must hide the message.");

    // 3. ABANDONO: el mensaje vuelve a circular con conteo incrementado.
    broker.abandon(&first_lease[0]).await.expect("abandon");
    let redelivered = broker.receive_batch("escalations", 10, 60).await.expect("receive");
    assert_eq!(redelivered.len(), 1);
    assert_eq!(redelivered[0].delivery_count, 2, "Redelivery must increment the count.");
    assert_eq!(redelivered[0].message_identifier, first_lease[0].message_identifier);

    println!("   ✅ At-least-once: abandon produced a redelivery.");
}

/**
 * CERTIFICACIÓN: dead-letter es terminal y el payload corrupto parsea a fallo.
 */
#[tokio::test]
async fn certify_dead_letter_terminality() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating dead-letter triage...");

    let broker = forge_broker().await;
    broker
        .enqueue("image-queries", &json!({"not_the_contract": true}))
        .await
        .expect("enqueue");

    let leased = broker.receive_batch("image-queries", 10, 60).await.expect("receive");
    assert_eq!(leased.len(), 1);

    // El contrato del consumidor rechaza el payload → clasificación permanente.
    #[derive(serde::Deserialize)]
    #[allow(dead_code)]
    struct StrictEnvelope {
        image_query_id: String,
        blob_url: String,
    }
    let decode_fault = leased[0].decode::<StrictEnvelope>();
    assert!(decode_fault.is_err(), "Hostile payload must fail the typed decode.");

    broker
        .dead_letter(&leased[0], "PAYLOAD_CORRUPTION: missing required fields")
        .await
        .expect("dead-letter");

    // Terminal: jamás vuelve a circular.
    let post_mortem = broker.receive_batch("image-queries", 10, 60).await.expect("receive");
    assert!(post_mortem.is_empty(), "A dead-lettered message must never redeliver.");
    assert_eq!(broker.pending_depth("image-queries").await.unwrap(), 0);

    println!("   ✅ Dead-letter: terminal seal certified.");
}

/**
 * CERTIFICACIÓN: orden FIFO del lote y aislamiento entre colas.
 */
#[tokio::test]
async fn certify_batch_order_and_queue_isolation() {
    let broker = forge_broker().await;

    for sequence in 0..3 {
        broker
            .enqueue("image-queries", &json!({"sequence": sequence}))
            .await
            .expect("enqueue");
    }
    broker.enqueue("escalations", &json!({"sequence": 99})).await.expect("enqueue");

    let leased = broker.receive_batch("image-queries", 10, 60).await.expect("receive");
    assert_eq!(leased.len(), 3, "Foreign queues must not leak into the batch.");

    let sequences: Vec<i64> = leased
        .iter()
        .map(|message| {
            serde_json::from_str::<serde_json::Value>(&message.payload_json).unwrap()["sequence"]
                .as_i64()
                .unwrap()
        })
        .collect();
    assert_eq!(sequences, vec![0, 1, 2], "Batch must honor oldest-first ordering.");
}
