// [libs/infra/notify/src/lib.rs]
/*!
 * =================================================================
 * APARATO: NOTIFICATION CHANNELS ROOT (V4.1 - BEST EFFORT)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: EXPOSICIÓN DE CANALES DE DESPACHO DE ALERTAS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. BEST EFFORT DISCIPLINE: El fallo de un canal se registra y jamás
 *    impide el despacho por los canales restantes ni aborta la
 *    operación principal.
 * 2. CREDENTIAL GATING: Un canal sin credenciales configuradas se
 *    degrada a no-op con rastro de advertencia, nunca a error.
 * =================================================================
 */

pub mod email;
pub mod errors;
pub mod sms;
pub mod webhook;

pub use email::EmailDispatcher;
pub use errors::NotifyError;
pub use sms::SmsDispatcher;
pub use webhook::WebhookDispatcher;
