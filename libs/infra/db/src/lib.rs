// [libs/infra/db/src/lib.rs]
/*!
 * =================================================================
 * APARATO: CONTROL PLANE PERSISTENCE ROOT (V4.1 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: EXPOSICIÓN NOMINAL DEL CLIENTE Y LOS REPOSITORIOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. FLAT AGGREGATES: Cada repositorio opera sobre registros de valor
 *    planos con llaves foráneas explícitas; sin navegación perezosa.
 * 2. MEMORY PARITY: El cliente soporta ':memory:' con ancla de
 *    persistencia para pruebas herméticas multi-hilo.
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod schema;
pub mod repositories;

pub use client::TursoClient;
pub use errors::DbError;
