// [libs/infra/notify/src/errors.rs]
//! =================================================================
//! APARATO: NOTIFY ERROR CATALOG (V4.0 - SOBERANO)
//! CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
//! RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE DESPACHO
//! =================================================================

use thiserror::Error;

/// Fallos semánticos de los canales de notificación.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Fallo de red hacia la API del proveedor.
    #[error("[L3_NOTIFY_FAULT]: PROVIDER_UNREACHABLE -> {0}")]
    NetworkFault(#[from] reqwest::Error),

    /// La API del proveedor rechazó el despacho.
    #[error("[L3_NOTIFY_FAULT]: PROVIDER_REJECTION -> HTTP_{0}")]
    ProviderRejection(u16),

    /// El canal carece de credenciales configuradas.
    #[error("[L3_NOTIFY_FAULT]: CHANNEL_UNCONFIGURED -> {0}")]
    ChannelUnconfigured(&'static str),
}
