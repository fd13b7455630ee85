// [tests/mirror/libs/infra/blob_vault/vault_roundtrip.test.rs]
/**
 * =================================================================
 * APARATO: BLOB VAULT CERTIFIER (V3.2 - ROUND TRIP PROOF)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L3-VAULT)
 * RESPONSABILIDAD: CERTIFICACIÓN DE IDA Y VUELTA, BORRADO Y FIRMADO
 * =================================================================
 */

use intellioptics_infra_blob_vault::{split_blob_path, BlobVault, VaultError};

/// Descriptor con clave de cuenta (base64 de material de prueba).
const TEST_CONNECTION_DESCRIPTOR: &str =
    "AccountName=provingrounds;AccountKey=c292ZXJlaWduLXRlc3Qta2V5;Endpoint=http://127.0.0.1:9000/blobs";

fn forge_vault(root: &std::path::Path) -> BlobVault {
    BlobVault::open(root, TEST_CONNECTION_DESCRIPTOR).expect("descriptor must parse")
}

/**
 * CERTIFICACIÓN: upload → download bit-perfecto y ruta persistible.
 */
#[tokio::test]
async fn certify_upload_download_roundtrip() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating vault round trip...");

    let scratch_root = tempfile::tempdir().expect("scratch directory");
    let vault = forge_vault(scratch_root.path());

    let artifact_bytes: Vec<u8> = (0..=255).cycle().take(4096).collect();

    // 1. SUBIDA (creación perezosa del contenedor)
    let blob_path = vault
        .upload("images", "queries/det-1/frame.jpg", &artifact_bytes, "image/jpeg")
        .await
        .expect("upload must succeed");
    assert_eq!(blob_path, "images/queries/det-1/frame.jpg");

    // 2. DESCARGA BIT-PERFECTA
    let recovered_bytes = vault
        .download("images", "queries/det-1/frame.jpg")
        .await
        .expect("download must succeed");
    assert_eq!(recovered_bytes, artifact_bytes, "BYTE_DRIFT: round trip corrupted the artifact.");

    // 3. SIDECAR DE TIPO DE CONTENIDO
    let content_type = vault.content_type("images", "queries/det-1/frame.jpg").await;
    assert_eq!(content_type.as_deref(), Some("image/jpeg"));

    println!("   ✅ Round trip: {} bytes bit-perfect.", artifact_bytes.len());
}

/**
 * CERTIFICACIÓN: delete idempotente y not-found tras la purga.
 */
#[tokio::test]
async fn certify_delete_semantics() {
    let scratch_root = tempfile::tempdir().expect("scratch directory");
    let vault = forge_vault(scratch_root.path());

    vault
        .upload("images", "ephemeral.bin", b"short-lived", "application/octet-stream")
        .await
        .expect("upload must succeed");

    // 1. PRIMERA PURGA: existed=true.
    let existed = vault.delete("images", "ephemeral.bin").await.expect("delete resolves");
    assert!(existed);

    // 2. SEGUNDA PURGA: not-found es éxito con existed=false.
    let existed_again = vault.delete("images", "ephemeral.bin").await.expect("delete resolves");
    assert!(!existed_again);

    // 3. DESCARGA POST-PURGA: ObjectNotFound semántico.
    let fault = vault.download("images", "ephemeral.bin").await;
    assert!(matches!(fault, Err(VaultError::ObjectNotFound { .. })));
}

/**
 * CERTIFICACIÓN: firmado portador con verificación y expiración.
 */
#[tokio::test]
async fn certify_signed_url_lifecycle() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating bearer URL lifecycle...");

    let scratch_root = tempfile::tempdir().expect("scratch directory");
    let vault = forge_vault(scratch_root.path());

    let signed_url = vault.sign("images", "frame.jpg", 3600).expect("signing must resolve");
    assert!(signed_url.contains("exp="));
    assert!(signed_url.contains("sig="));

    // Extracción de los parámetros emitidos para la verificación.
    let query_fragment = signed_url.split_once('?').expect("query present").1;
    let mut expiry_unix = 0_u64;
    let mut signature = String::new();
    for parameter in query_fragment.split('&') {
        match parameter.split_once('=') {
            Some(("exp", value)) => expiry_unix = value.parse().expect("numeric expiry"),
            Some(("sig", value)) => signature = value.to_string(),
            _ => {}
        }
    }

    assert!(vault.verify_signature("images", "frame.jpg", expiry_unix, &signature));
    // Firma forjada o contenedor ajeno: rechazo.
    assert!(!vault.verify_signature("images", "other.jpg", expiry_unix, &signature));
    assert!(!vault.verify_signature("images", "frame.jpg", expiry_unix, "deadbeef"));

    println!("   ✅ Bearer URL: issuance and verification certified.");
}

/**
 * CERTIFICACIÓN: rechazo de ascenso de rutas y rutas malformadas.
 */
#[tokio::test]
async fn certify_hostile_paths_rejected() {
    let scratch_root = tempfile::tempdir().expect("scratch directory");
    let vault = forge_vault(scratch_root.path());

    let fault = vault.download("images", "../escape/secret").await;
    assert!(matches!(fault, Err(VaultError::PathTraversalRejected(_))));

    assert!(matches!(split_blob_path("no-separator"), Err(VaultError::MalformedObjectPath(_))));
    assert_eq!(split_blob_path("images/a/b.jpg").unwrap(), ("images", "a/b.jpg"));
}
