// [libs/infra/model-cache/src/cache.rs]
/*!
 * =================================================================
 * APARATO: SESSION CACHE ENGINE (V4.3 - SINGLE FLIGHT GOLD)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: LRU POR FRECUENCIA APROXIMADA CON CARGA SINGLE-FLIGHT
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. FREQUENCY-APPROXIMATE LRU: La evicción descarta la entrada de
 *    conteo de accesos mínimo cuando el estante está lleno y la llave
 *    entrante es nueva (política heredada del plano de inferencia).
 * 2. SINGLE FLIGHT PER KEY: Los solicitantes concurrentes de una misma
 *    llave esperan a un único cargador y comparten su resultado.
 * 3. HOLDER SAFETY: Las sesiones viajan como Arc<S>; una evicción jamás
 *    invalida la sesión de un tenedor vivo.
 *
 * # Mathematical Proof (Load Uniqueness):
 * Para toda llave k, el candado de vuelo G(k) serializa la sección
 * [recheck → load → insert]. El primer poseedor carga; todo sucesor
 * encuentra el hit en el recheck. Luego |cargas(k)| ≤ 1 por ventana de
 * residencia.
 * =================================================================
 */

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Rol del artefacto dentro del ensamblaje de un detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelRole {
    /// Modelo de detección primario.
    Primary,
    /// Clasificador de dominio (Out-Of-Domain Detector).
    Oodd,
}

impl ModelRole {
    /// Fragmento de ruta del rol en la capa de disco.
    pub fn as_path_fragment(&self) -> &'static str {
        match self {
            ModelRole::Primary => "primary",
            ModelRole::Oodd => "oodd",
        }
    }
}

/// Entrada viva del estante con su contador de frecuencia.
struct ShelfEntry<S> {
    session: Arc<S>,
    access_count: u64,
    /// Secuencia de admisión: desempata la evicción hacia la más antigua.
    admitted_sequence: u64,
}

/// Caché de sesiones genérico, seguro para lectores y escritores.
pub struct SessionCache<S> {
    shelf_capacity: usize,
    shelf: Mutex<HashMap<(String, ModelRole), ShelfEntry<S>>>,
    flight_guards: Mutex<HashMap<(String, ModelRole), Arc<Mutex<()>>>>,
    admission_counter: std::sync::atomic::AtomicU64,
}

impl<S> SessionCache<S> {
    /// Forja un caché con la capacidad de estante indicada.
    pub fn new(shelf_capacity: usize) -> Self {
        Self {
            shelf_capacity: shelf_capacity.max(1),
            shelf: Mutex::new(HashMap::new()),
            flight_guards: Mutex::new(HashMap::new()),
            admission_counter: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /**
     * Hit de caché: retorna la sesión e incrementa su frecuencia.
     */
    pub async fn get(&self, cache_key: &(String, ModelRole)) -> Option<Arc<S>> {
        let mut shelf_guard = self.shelf.lock().await;
        match shelf_guard.get_mut(cache_key) {
            Some(entry) => {
                entry.access_count += 1;
                debug!("🎯 [MODEL_CACHE]: HIT for ({}, {:?})", cache_key.0, cache_key.1);
                Some(Arc::clone(&entry.session))
            }
            None => {
                debug!("🕳️ [MODEL_CACHE]: MISS for ({}, {:?})", cache_key.0, cache_key.1);
                None
            }
        }
    }

    /**
     * Inserta una sesión, desalojando la de frecuencia mínima si el
     * estante está lleno y la llave es nueva.
     */
    pub async fn put(&self, cache_key: (String, ModelRole), session: S) -> Arc<S> {
        let mut shelf_guard = self.shelf.lock().await;

        if shelf_guard.len() >= self.shelf_capacity && !shelf_guard.contains_key(&cache_key) {
            // Evicción por frecuencia mínima; empate → admisión más antigua.
            if let Some(eviction_key) = shelf_guard
                .iter()
                .min_by_key(|(_, entry)| (entry.access_count, entry.admitted_sequence))
                .map(|(key, _)| key.clone())
            {
                info!("💨 [MODEL_CACHE]: Evicting ({}, {:?})", eviction_key.0, eviction_key.1);
                shelf_guard.remove(&eviction_key);
            }
        }

        let shared_session = Arc::new(session);
        let admitted_sequence = self
            .admission_counter
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        shelf_guard.insert(
            cache_key.clone(),
            ShelfEntry {
                session: Arc::clone(&shared_session),
                access_count: 1,
                admitted_sequence,
            },
        );

        info!(
            "📥 [MODEL_CACHE]: Session shelved for ({}, {:?}). Occupancy: {}/{}",
            cache_key.0, cache_key.1, shelf_guard.len(), self.shelf_capacity
        );
        shared_session
    }

    /**
     * Adquisición con carga single-flight por llave.
     *
     * # Logic:
     * 1. Hit directo → retorno inmediato.
     * 2. Miss → adquisición del candado de vuelo de la llave, recheck
     *    (un predecesor pudo cargar), carga única e inserción.
     */
    pub async fn get_or_load<LoaderFn, LoaderFuture, LoadError>(
        &self,
        cache_key: (String, ModelRole),
        loader: LoaderFn,
    ) -> Result<Arc<S>, LoadError>
    where
        LoaderFn: FnOnce() -> LoaderFuture,
        LoaderFuture: Future<Output = Result<S, LoadError>>,
    {
        if let Some(resident_session) = self.get(&cache_key).await {
            return Ok(resident_session);
        }

        // Candado de vuelo por llave (los solicitantes comparten un único cargador).
        let flight_guard = {
            let mut guards = self.flight_guards.lock().await;
            Arc::clone(guards.entry(cache_key.clone()).or_insert_with(|| Arc::new(Mutex::new(()))))
        };

        let _flight_permit = flight_guard.lock().await;

        // Recheck: el poseedor anterior del candado pudo completar la carga.
        if let Some(resident_session) = self.get(&cache_key).await {
            return Ok(resident_session);
        }

        let loaded_session = loader().await?;
        let shared_session = self.put(cache_key.clone(), loaded_session).await;

        // Higiene del mapa de vuelos (el candado muere con el último Arc).
        self.flight_guards.lock().await.remove(&cache_key);

        Ok(shared_session)
    }

    /// Ocupación vigente del estante.
    pub async fn len(&self) -> usize {
        self.shelf.lock().await.len()
    }

    /// true si la llave reside en el estante (sin tocar la frecuencia).
    pub async fn contains(&self, cache_key: &(String, ModelRole)) -> bool {
        self.shelf.lock().await.contains_key(cache_key)
    }
}
