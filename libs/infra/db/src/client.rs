// [libs/infra/db/src/client.rs]
/*!
 * =================================================================
 * APARATO: DATABASE CONNECTION CLIENT (V4.4 - TOPOLOGY RESOLVED)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: RESOLUCIÓN DE TOPOLOGÍA DE ENLACE Y PERSISTENCIA ACID
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. EXPLICIT TOPOLOGY: La URL se resuelve una única vez a una
 *    topología cerrada (cluster remoto, residente en RAM, ledger
 *    local); cada topología porta su propia disciplina de conexión.
 * 2. SINGLE BOOTSTRAP LINK: Una sola conexión ejecuta la nivelación de
 *    esquema; en topología RAM esa misma conexión queda retenida como
 *    ancla, garantizando que las tablas vivan en el segmento compartido.
 *
 * # Mathematical Proof (Anchor Retention):
 * En RAM, el esquema se aplica sobre la conexión que el cliente retiene
 * de por vida; toda conexión servida después es un clon de ese handle,
 * luego ninguna lectura puede observar un ledger sin esquema.
 * =================================================================
 */

use crate::errors::DbError;
use crate::schema::apply_full_inspection_schema;
use libsql::{Builder, Connection, Database};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Topología del enlace de persistencia, derivada de la URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkTopology {
    /// Cluster gestionado ('libsql://' o 'https://'); exige token.
    RemoteCluster,
    /// Ledger efímero en RAM compartida (pruebas herméticas).
    MemoryResident,
    /// Archivo de ledger en disco local.
    LocalLedger,
}

impl LinkTopology {
    fn resolve(database_connection_url: &str) -> Self {
        if database_connection_url.starts_with("libsql://")
            || database_connection_url.starts_with("https://")
        {
            LinkTopology::RemoteCluster
        } else if database_connection_url.contains(":memory:")
            || database_connection_url.contains("mode=memory")
        {
            LinkTopology::MemoryResident
        } else {
            LinkTopology::LocalLedger
        }
    }
}

/// Cliente soberano del sustrato de persistencia del plano de control.
#[derive(Clone)]
pub struct TursoClient {
    internal_database_driver: Arc<Database>,
    /// Conexión de nivelación retenida; ancla del ledger en topología RAM.
    _memory_persistence_anchor: Option<Arc<Connection>>,
}

impl TursoClient {
    /**
     * Establece el enlace de persistencia y nivela el esquema.
     *
     * # Logic:
     * 1. Resolución de topología desde la URL (cerrada, sin fallbacks).
     * 2. Ignición del driver según topología (token exigido en remoto).
     * 3. Nivelación de esquema sobre una única conexión de bootstrap,
     *    retenida como ancla cuando el ledger reside en RAM.
     *
     * # Errors:
     * - `ConnectionError`: URL vacía, token ausente, driver o esquema caídos.
     */
    #[instrument(skip(database_access_token))]
    pub async fn connect(
        database_connection_url: &str,
        database_access_token: Option<String>,
    ) -> Result<Self, DbError> {
        if database_connection_url.trim().is_empty() {
            return Err(DbError::ConnectionError("PERSISTENCE_URL_VOID".into()));
        }

        let link_topology = LinkTopology::resolve(database_connection_url);
        info!(
            "🔌 [DATABASE]: Opening {:?} link to [{}]",
            link_topology, database_connection_url
        );

        let database_driver = match link_topology {
            LinkTopology::RemoteCluster => {
                let cluster_token = database_access_token.ok_or_else(|| {
                    DbError::ConnectionError("CLUSTER_TOKEN_ABSENT: remote link refused".into())
                })?;
                Builder::new_remote(database_connection_url.to_string(), cluster_token)
                    .build()
                    .await
            }
            LinkTopology::MemoryResident | LinkTopology::LocalLedger => {
                Builder::new_local(database_connection_url).build().await
            }
        }
        .map_err(|driver_fault| {
            DbError::ConnectionError(format!(
                "ENGINE_START_REJECTED ({:?}): {}",
                link_topology, driver_fault
            ))
        })?;

        // Una única conexión de nivelación; en RAM se retiene como ancla.
        let bootstrap_connection = database_driver.connect().map_err(|link_fault| {
            DbError::ConnectionError(format!("LINK_OPEN_REJECTED: {}", link_fault))
        })?;

        apply_full_inspection_schema(&bootstrap_connection)
            .await
            .map_err(|schema_fault| {
                DbError::ConnectionError(format!("SCHEMA_LEVELING_FAILED: {}", schema_fault))
            })?;

        let memory_persistence_anchor = match link_topology {
            LinkTopology::MemoryResident => {
                debug!("⚓ [DATABASE]: RAM ledger anchored on the bootstrap link.");
                Some(Arc::new(bootstrap_connection))
            }
            _ => None,
        };

        Ok(Self {
            internal_database_driver: Arc::new(database_driver),
            _memory_persistence_anchor: memory_persistence_anchor,
        })
    }

    /// Adquiere una conexión táctica (o un clon del ancla en topología RAM).
    pub fn get_connection(&self) -> Result<Connection, DbError> {
        if let Some(anchor) = &self._memory_persistence_anchor {
            return Ok(anchor.as_ref().clone());
        }

        self.internal_database_driver.connect().map_err(|allocation_fault| {
            error!("⚠️ [POOL_FAULT]: Connection allocation failed: {}", allocation_fault);
            DbError::ConnectionError(allocation_fault.to_string())
        })
    }
}
