//! Controller cache with an explicit lifecycle
//!
//! One controller per application, created lazily and reused for the life
//! of the registry. Creation happens under the map lock so concurrent
//! requests never build two controllers for one application. Each
//! controller sits behind its own mutex; the engine holds it for a whole
//! plan, which serializes executions per controller.

use crate::controller::apps::{build_controller, GenericController};
use crate::controller::shell::is_installed;
use crate::controller::{Controller, ControllerError};
use crate::core::config::ExecutionConfig;
use crate::core::types::ApplicationId;
use ahash::AHashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type SharedController = Arc<Mutex<Box<dyn Controller>>>;

/// Builds controllers; swap it out to observe or fake construction
pub trait ControllerFactory: Send + Sync {
    fn create(&self, application: ApplicationId) -> Result<Box<dyn Controller>, ControllerError>;

    /// Used for one execution when `create` fails; never cached
    fn fallback(&self, application: ApplicationId) -> Box<dyn Controller> {
        Box::new(GenericController::new(application))
    }
}

/// Builds the stock controllers, refusing ones whose program is missing
pub struct DefaultControllerFactory {
    config: ExecutionConfig,
}

impl DefaultControllerFactory {
    pub fn new(config: ExecutionConfig) -> Self {
        Self { config }
    }

    /// Program a dedicated controller cannot work without
    fn required_program(application: ApplicationId) -> Option<&'static str> {
        match application {
            ApplicationId::Chrome => Some("google-chrome"),
            ApplicationId::Firefox => Some("firefox"),
            ApplicationId::Vscode => Some("code"),
            ApplicationId::Excel => Some("libreoffice"),
            ApplicationId::Telegram => Some("telegram-desktop"),
            ApplicationId::Spotify => Some("spotify"),
            ApplicationId::Vlc => Some("vlc"),
            ApplicationId::Git => Some("git"),
            ApplicationId::Docker => Some("docker"),
            _ => None,
        }
    }
}

impl ControllerFactory for DefaultControllerFactory {
    fn create(&self, application: ApplicationId) -> Result<Box<dyn Controller>, ControllerError> {
        if let Some(program) = Self::required_program(application) {
            if !is_installed(program) {
                return Err(ControllerError::NotInstalled(program.to_string()));
            }
        }
        Ok(build_controller(application, &self.config))
    }
}

/// Result of asking the registry for a controller
pub enum Acquired {
    Cached(SharedController),
    /// Construction failed; `controller` is a throwaway generic one
    Fallback {
        controller: Box<dyn Controller>,
        error: ControllerError,
    },
}

pub struct ControllerRegistry {
    factory: Arc<dyn ControllerFactory>,
    controllers: Mutex<AHashMap<ApplicationId, SharedController>>,
}

impl ControllerRegistry {
    pub fn new(factory: Arc<dyn ControllerFactory>) -> Self {
        Self {
            factory,
            controllers: Mutex::new(AHashMap::new()),
        }
    }

    /// Resolve or create the controller for `application`
    pub async fn acquire(&self, application: ApplicationId) -> Acquired {
        let mut controllers = self.controllers.lock().await;
        if let Some(existing) = controllers.get(&application) {
            return Acquired::Cached(Arc::clone(existing));
        }

        match self.factory.create(application) {
            Ok(controller) => {
                tracing::info!(app = %application, controller = controller.name(), "Controller created");
                let shared: SharedController = Arc::new(Mutex::new(controller));
                controllers.insert(application, Arc::clone(&shared));
                Acquired::Cached(shared)
            }
            Err(error) => {
                tracing::warn!(app = %application, error = %error, "Controller unavailable, using generic fallback");
                Acquired::Fallback {
                    controller: self.factory.fallback(application),
                    error,
                }
            }
        }
    }

    /// Number of cached controllers
    pub async fn len(&self) -> usize {
        self.controllers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Close and drop every cached controller
    pub async fn shutdown(&self) {
        let drained: Vec<(ApplicationId, SharedController)> =
            self.controllers.lock().await.drain().collect();

        for (application, shared) in drained {
            let mut controller = shared.lock().await;
            match controller.close().await {
                Ok(detail) => tracing::debug!(app = %application, %detail, "Controller closed"),
                Err(e) => tracing::warn!(app = %application, error = %e, "Controller close failed"),
            }
        }
        tracing::info!("Controller registry shut down");
    }
}
