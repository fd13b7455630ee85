// [libs/infra/queue/src/lib.rs]
/*!
 * =================================================================
 * APARATO: MESSAGE QUEUE BROKER (V3.5 - LEASE DISCIPLINE)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ENCOLADO, ARRENDAMIENTO DE VISIBILIDAD Y ACUSE EXPLÍCITO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. AT-LEAST-ONCE: Un arrendamiento expirado devuelve el mensaje al
 *    estrato receptible; los consumidores deben tolerar duplicados.
 * 2. LEASE TOKEN SOVEREIGNTY: complete/abandon/dead_letter exigen el
 *    token entregado en la recepción; el acuse ocurre en el mismo
 *    receptor que leyó el mensaje.
 * 3. TERMINAL DEAD-LETTER: Un payload imparseable se sella como 'dead'
 *    con motivo forense y no vuelve a circular.
 *
 * # Mathematical Proof (Lease Exclusivity):
 * La recepción marca filas con un token UUID fresco en una única
 * sentencia UPDATE con sub-selección; dos receptores concurrentes jamás
 * obtienen la misma fila dentro de una ventana de visibilidad viva.
 * =================================================================
 */

pub mod errors;

pub use errors::QueueError;

use chrono::{Duration as ChronoDuration, Utc};
use libsql::{params, Builder, Connection, Database};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// DDL del sustrato de mensajes (aplicado en la conexión del broker).
const QUEUE_TABLE_DDL: &str = "
    CREATE TABLE IF NOT EXISTS queue_messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        message_identifier TEXT NOT NULL,
        queue_name TEXT NOT NULL,
        payload_json TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'ready',
        delivery_count INTEGER NOT NULL DEFAULT 0,
        lease_token TEXT,
        leased_until TEXT,
        dead_reason TEXT,
        created_at TEXT NOT NULL
    )";

/// Índice de aceleración del pop de mensajes receptibles.
const QUEUE_INDEX_DDL: &str = "
    CREATE INDEX IF NOT EXISTS idx_queue_ready
        ON queue_messages (queue_name, status, created_at)";

/// Mensaje arrendado entregado a un receptor.
#[derive(Debug, Clone)]
pub struct LeasedMessage {
    /// Identificador estable del mensaje (sobrevive redeliveries).
    pub message_identifier: String,
    /// Cola de origen.
    pub queue_name: String,
    /// Payload JSON crudo.
    pub payload_json: String,
    /// Cantidad de entregas acumuladas (detección de duplicados).
    pub delivery_count: u32,
    /// Token de arrendamiento requerido para el acuse.
    pub lease_token: String,
    row_id: i64,
}

impl LeasedMessage {
    /// Decodifica el payload al contrato tipado del consumidor.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, QueueError> {
        serde_json::from_str(&self.payload_json)
            .map_err(|fault| QueueError::PayloadCorruption(fault.to_string()))
    }
}

/// Broker soberano de mensajería sobre el motor libSQL.
#[derive(Clone)]
pub struct QueueBroker {
    internal_database_driver: Arc<Database>,
    /// Ancla de persistencia para bases ':memory:' compartidas entre hilos.
    _memory_persistence_anchor: Option<Arc<Connection>>,
}

impl QueueBroker {
    /**
     * Establece el enlace con el sustrato de mensajes y aplica el DDL.
     *
     * # Errors:
     * - `ConnectionFault`: URL vacía, token ausente en remoto o driver caído.
     */
    #[instrument(skip(database_access_token))]
    pub async fn connect(
        database_connection_url: &str,
        database_access_token: Option<String>,
    ) -> Result<Self, QueueError> {
        if database_connection_url.is_empty() {
            return Err(QueueError::ConnectionFault("QUEUE_URL_UNDEFINED".into()));
        }

        info!("🔌 [QUEUE]: Initiating broker link to [{}]", database_connection_url);

        let is_remote = database_connection_url.starts_with("libsql://")
            || database_connection_url.starts_with("https://");
        let is_memory = database_connection_url.contains(":memory:")
            || database_connection_url.contains("mode=memory");

        let database_driver = if is_remote {
            let token = database_access_token.ok_or_else(|| {
                QueueError::ConnectionFault("REMOTE_ACCESS_DENIED: token missing".into())
            })?;
            Builder::new_remote(database_connection_url.to_string(), token).build().await
        } else {
            Builder::new_local(database_connection_url).build().await
        }
        .map_err(|fault| QueueError::ConnectionFault(format!("DRIVER_IGNITION_FAILURE: {}", fault)))?;

        let shared_driver = Arc::new(database_driver);
        let bootstrap_connection = shared_driver
            .connect()
            .map_err(|fault| QueueError::ConnectionFault(format!("BOOTSTRAP_LINK_FAULT: {}", fault)))?;

        for schema_statement in [QUEUE_TABLE_DDL, QUEUE_INDEX_DDL] {
            bootstrap_connection
                .execute(schema_statement, ())
                .await
                .map_err(|fault| QueueError::ConnectionFault(format!("SCHEMA_SYNC_FAULT: {}", fault)))?;
        }

        let anchor = is_memory.then(|| Arc::new(bootstrap_connection));

        Ok(Self {
            internal_database_driver: shared_driver,
            _memory_persistence_anchor: anchor,
        })
    }

    fn acquire_connection(&self) -> Result<Connection, QueueError> {
        if let Some(anchor) = &self._memory_persistence_anchor {
            // En modo memoria la identidad de conexión preserva el esquema.
            return Ok(anchor.as_ref().clone());
        }
        self.internal_database_driver
            .connect()
            .map_err(|fault| QueueError::ConnectionFault(fault.to_string()))
    }

    /**
     * Encola un payload JSON; retorna el identificador del mensaje.
     */
    #[instrument(skip(self, payload), fields(queue = %queue_name))]
    pub async fn enqueue(
        &self,
        queue_name: &str,
        payload: &serde_json::Value,
    ) -> Result<String, QueueError> {
        let connection = self.acquire_connection()?;
        let message_identifier = Uuid::new_v4().to_string();

        connection
            .execute(
                "INSERT INTO queue_messages
                    (message_identifier, queue_name, payload_json, status, created_at)
                 VALUES (?1, ?2, ?3, 'ready', ?4)",
                params![
                    message_identifier.clone(),
                    queue_name,
                    payload.to_string(),
                    Utc::now().to_rfc3339()
                ],
            )
            .await?;

        debug!("📨 [QUEUE_ENQUEUE]: Message {} crystallized on [{}]", message_identifier, queue_name);
        Ok(message_identifier)
    }

    /**
     * Arrienda hasta 'max_messages' mensajes receptibles, del más antiguo
     * al más reciente.
     *
     * # Logic:
     * Receptible = 'ready' con arrendamiento nulo o expirado. La marca de
     * arrendamiento y el incremento de entregas ocurren en una única
     * sentencia UPDATE con sub-selección (exclusividad de lote).
     */
    #[instrument(skip(self), fields(queue = %queue_name))]
    pub async fn receive_batch(
        &self,
        queue_name: &str,
        max_messages: usize,
        visibility_seconds: i64,
    ) -> Result<Vec<LeasedMessage>, QueueError> {
        let connection = self.acquire_connection()?;

        let batch_lease_token = Uuid::new_v4().to_string();
        let now_stamp = Utc::now().to_rfc3339();
        let lease_horizon = (Utc::now() + ChronoDuration::seconds(visibility_seconds)).to_rfc3339();

        let leased_rows = connection
            .execute(
                "UPDATE queue_messages
                    SET lease_token = ?1,
                        leased_until = ?2,
                        delivery_count = delivery_count + 1
                  WHERE id IN (
                        SELECT id FROM queue_messages
                         WHERE queue_name = ?3
                           AND status = 'ready'
                           AND (leased_until IS NULL OR leased_until < ?4)
                         ORDER BY created_at ASC, id ASC
                         LIMIT ?5
                  )",
                params![
                    batch_lease_token.clone(),
                    lease_horizon,
                    queue_name,
                    now_stamp,
                    max_messages as i64
                ],
            )
            .await?;

        if leased_rows == 0 {
            return Ok(Vec::new());
        }

        let mut query_results = connection
            .query(
                "SELECT id, message_identifier, queue_name, payload_json, delivery_count
                   FROM queue_messages
                  WHERE lease_token = ?1
                  ORDER BY created_at ASC, id ASC",
                params![batch_lease_token.clone()],
            )
            .await?;

        let mut leased_batch = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            let row_id: i64 = data_row.get(0)?;
            let message_identifier: String = data_row.get(1)?;
            let queue_of_row: String = data_row.get(2)?;
            let payload_json: String = data_row.get(3)?;
            let delivery_count: i64 = data_row.get(4)?;

            leased_batch.push(LeasedMessage {
                message_identifier,
                queue_name: queue_of_row,
                payload_json,
                delivery_count: delivery_count as u32,
                lease_token: batch_lease_token.clone(),
                row_id,
            });
        }

        debug!("📬 [QUEUE_LEASE]: {} message(s) leased from [{}]", leased_batch.len(), queue_name);
        Ok(leased_batch)
    }

    /**
     * Acusa el procesamiento exitoso: el mensaje desaparece del sustrato.
     *
     * # Errors:
     * - `LeaseExpired`: Otro receptor re-arrendó el mensaje entre tanto.
     */
    #[instrument(skip(self, leased_message), fields(message = %leased_message.message_identifier))]
    pub async fn complete(&self, leased_message: &LeasedMessage) -> Result<(), QueueError> {
        let connection = self.acquire_connection()?;

        let purged = connection
            .execute(
                "DELETE FROM queue_messages WHERE id = ?1 AND lease_token = ?2",
                params![leased_message.row_id, leased_message.lease_token.clone()],
            )
            .await?;

        if purged == 0 {
            return Err(QueueError::LeaseExpired(leased_message.message_identifier.clone()));
        }
        Ok(())
    }

    /**
     * Abandona el arrendamiento: el mensaje vuelve a ser receptible.
     */
    #[instrument(skip(self, leased_message), fields(message = %leased_message.message_identifier))]
    pub async fn abandon(&self, leased_message: &LeasedMessage) -> Result<(), QueueError> {
        let connection = self.acquire_connection()?;

        connection
            .execute(
                "UPDATE queue_messages
                    SET lease_token = NULL, leased_until = NULL
                  WHERE id = ?1 AND lease_token = ?2",
                params![leased_message.row_id, leased_message.lease_token.clone()],
            )
            .await?;

        warn!("↩️ [QUEUE_ABANDON]: Message {} released for redelivery", leased_message.message_identifier);
        Ok(())
    }

    /**
     * Sella el mensaje como 'dead' con motivo forense (fallo permanente).
     */
    #[instrument(skip(self, leased_message), fields(message = %leased_message.message_identifier))]
    pub async fn dead_letter(
        &self,
        leased_message: &LeasedMessage,
        dead_reason: &str,
    ) -> Result<(), QueueError> {
        let connection = self.acquire_connection()?;

        connection
            .execute(
                "UPDATE queue_messages
                    SET status = 'dead', dead_reason = ?1,
                        lease_token = NULL, leased_until = NULL
                  WHERE id = ?2 AND lease_token = ?3",
                params![dead_reason, leased_message.row_id, leased_message.lease_token.clone()],
            )
            .await?;

        warn!(
            "💀 [QUEUE_DEAD_LETTER]: Message {} sealed. Reason: {}",
            leased_message.message_identifier, dead_reason
        );
        Ok(())
    }

    /// Profundidad de mensajes 'ready' pendientes en una cola.
    pub async fn pending_depth(&self, queue_name: &str) -> Result<u64, QueueError> {
        let connection = self.acquire_connection()?;

        let mut query_results = connection
            .query(
                "SELECT COUNT(*) FROM queue_messages WHERE queue_name = ?1 AND status = 'ready'",
                params![queue_name],
            )
            .await?;

        let depth: i64 = match query_results.next().await? {
            Some(data_row) => data_row.get(0)?,
            None => 0,
        };
        Ok(depth as u64)
    }
}
