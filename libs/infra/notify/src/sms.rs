// [libs/infra/notify/src/sms.rs]
/*!
 * =================================================================
 * APARATO: SMS ALERT DISPATCHER (V4.1 - MMS CAPABLE)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: DESPACHO SMS/MMS VÍA API DEL PROVEEDOR DE TELEFONÍA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. E164 DISCIPLINE: Los destinatarios viajan en formato E.164; la
 *    imagen MMS se adjunta únicamente para números '+1'.
 * 2. PER-RECIPIENT DISPATCH: Cada número recibe su propio POST; el
 *    fallo de un destinatario no aborta los restantes.
 * =================================================================
 */

use crate::errors::NotifyError;
use reqwest::Client;
use tracing::{info, instrument, warn};

/// Despachador soberano de SMS de alertas.
pub struct SmsDispatcher {
    network_client: Client,
    account_sid: Option<String>,
    auth_token: Option<String>,
    sender_phone: Option<String>,
}

impl SmsDispatcher {
    /**
     * Forja el despachador. Sin credenciales completas queda en no-op.
     */
    pub fn new(
        account_sid: Option<String>,
        auth_token: Option<String>,
        sender_phone: Option<String>,
    ) -> Self {
        if account_sid.is_none() || auth_token.is_none() || sender_phone.is_none() {
            warn!("📵 [SMS]: Telephony credentials incomplete; SMS channel in standby mode.");
        }

        Self {
            network_client: Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .expect("FATAL: SMS client initialization failed."),
            account_sid,
            auth_token,
            sender_phone,
        }
    }

    /**
     * Despacha el mensaje a cada destinatario; la imagen se adjunta
     * como MMS solo para números norteamericanos ('+1').
     *
     * # Returns:
     * Cantidad de entregas aceptadas por el proveedor.
     */
    #[instrument(skip(self, message_body, image_url), fields(recipients = recipient_phones.len()))]
    pub async fn send_to_all(
        &self,
        recipient_phones: &[String],
        message_body: &str,
        image_url: Option<&str>,
    ) -> Result<usize, NotifyError> {
        let (Some(account_sid), Some(auth_token), Some(sender_phone)) =
            (&self.account_sid, &self.auth_token, &self.sender_phone)
        else {
            return Err(NotifyError::ChannelUnconfigured("sms"));
        };

        let provider_endpoint = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            account_sid
        );

        let mut accepted_deliveries = 0_usize;

        for recipient_phone in recipient_phones {
            let mut form_fields: Vec<(&str, String)> = vec![
                ("From", sender_phone.clone()),
                ("To", recipient_phone.clone()),
                ("Body", message_body.to_string()),
            ];

            // MMS con imagen: restringido a numeración norteamericana.
            if let Some(media_url) = image_url {
                if recipient_phone.starts_with("+1") {
                    form_fields.push(("MediaUrl", media_url.to_string()));
                }
            }

            let dispatch_outcome = self
                .network_client
                .post(&provider_endpoint)
                .basic_auth(account_sid, Some(auth_token))
                .form(&form_fields)
                .send()
                .await;

            match dispatch_outcome {
                Ok(provider_response) if provider_response.status().is_success() => {
                    info!("📱 [SMS]: Alert delivered to {}.", recipient_phone);
                    accepted_deliveries += 1;
                }
                Ok(provider_response) => {
                    warn!(
                        "⚠️ [SMS]: Provider rejected {}: HTTP_{}",
                        recipient_phone, provider_response.status()
                    );
                }
                Err(network_fault) => {
                    warn!("⚠️ [SMS]: Dispatch to {} failed: {}", recipient_phone, network_fault);
                }
            }
        }

        Ok(accepted_deliveries)
    }
}
