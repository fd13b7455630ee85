// [libs/infra/db/src/errors.rs]
/*!
 * =================================================================
 * APARATO: DATABASE ERROR CATALOG (V4.0 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE PERSISTENCIA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. HTTP TRIAGE READY: Las variantes mapean 1:1 a la taxonomía del
 *    plano de control (RecordNotFound → 404, SoftDeleted → 409...).
 * 2. ZERO ABBREVIATIONS: Nomenclatura nominal absoluta.
 * =================================================================
 */

use thiserror::Error;

/// Fallos semánticos del sustrato de persistencia.
#[derive(Error, Debug)]
pub enum DbError {
    /// Error de enlace físico o de red con el cluster.
    #[error("[L3_DB_NET_FAULT]: DATABASE_UPLINK_SEVERED -> {0}")]
    ConnectionError(String),

    /// Error de sintaxis o ejecución devuelto por el motor libSQL.
    #[error("[L3_DB_QUERY_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    QueryError(#[from] libsql::Error),

    /// Fallo en la transformación de tipos entre SQLite y el Dominio Rust.
    #[error("[L3_DB_MAPPING_FAULT]: DATA_MAPPING_VIOLATION -> {0}")]
    MappingError(String),

    /// Error al comprometer cambios en una secuencia multi-tabla.
    #[error("[L3_DB_FAULT]: TRANSACTION_COLLAPSE")]
    TransactionError,

    // --- ESTRATO DE ENTIDADES DE INSPECCIÓN ---

    /// La entidad solicitada no existe en las tablas activas.
    #[error("[L3_DB_FAULT]: RECORD_NOT_FOUND -> {entity} '{identifier}'")]
    RecordNotFound {
        /// Tipo nominal de la entidad ('detector', 'query'...).
        entity: &'static str,
        /// Identificador consultado.
        identifier: String,
    },

    /// La entidad existe pero porta un sello de borrado lógico.
    #[error("[L3_DB_FAULT]: SOFT_DELETED -> {entity} '{identifier}'")]
    SoftDeleted {
        /// Tipo nominal de la entidad.
        entity: &'static str,
        /// Identificador consultado.
        identifier: String,
    },

    /// Valor de enum persistido fuera del contrato cerrado del dominio.
    #[error("[L3_DB_MAPPING_FAULT]: UNKNOWN_VARIANT -> column '{column}' holds '{value}'")]
    UnknownVariant {
        /// Columna afectada.
        column: &'static str,
        /// Valor hostil encontrado.
        value: String,
    },
}

impl DbError {
    /// Forja nominal del fallo de entidad ausente.
    pub fn not_found(entity: &'static str, identifier: impl Into<String>) -> Self {
        DbError::RecordNotFound { entity, identifier: identifier.into() }
    }
}
