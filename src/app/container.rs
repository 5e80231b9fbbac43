use std::sync::Arc;

use crate::adapters::toml_config::ClipcutConfig;
use crate::adapters::{FFprobeAdapter, FfmpegLoader};
use crate::app::{
    clip_interactor::ClipInteractor, inspect_interactor::InspectInteractor,
    verify_interactor::VerifyInteractor,
};
use crate::domain::errors::DomainError;
use crate::engine::ClipExtractionEngine;
use crate::ports::{ProbePort, RuntimeLoader};

pub trait AppContainer: Send + Sync {
    fn engine(&self) -> Arc<ClipExtractionEngine>;
    fn clip_interactor(&self) -> Arc<ClipInteractor>;
    fn inspect_interactor(&self) -> Arc<InspectInteractor>;
    fn verify_interactor(&self) -> Arc<VerifyInteractor>;
}

pub struct DefaultAppContainer {
    engine: Arc<ClipExtractionEngine>,
    clip_interactor: Arc<ClipInteractor>,
    inspect_interactor: Arc<InspectInteractor>,
    verify_interactor: Arc<VerifyInteractor>,
}

impl DefaultAppContainer {
    /// Wire the production adapters for `config`
    pub fn new(config: &ClipcutConfig) -> Result<Self, DomainError> {
        let probe_port = Self::probe_port(config)?;
        Self::with_ports(config, Arc::new(FfmpegLoader::new()), probe_port)
    }

    #[cfg(not(feature = "libav"))]
    fn probe_port(config: &ClipcutConfig) -> Result<Arc<dyn ProbePort>, DomainError> {
        Ok(Arc::new(FFprobeAdapter::new(config.runtime.probe_binary.clone())))
    }

    #[cfg(feature = "libav")]
    fn probe_port(_config: &ClipcutConfig) -> Result<Arc<dyn ProbePort>, DomainError> {
        Ok(Arc::new(crate::adapters::ProbeLibavAdapter::new()?))
    }

    /// Wire explicit ports, e.g. the in-memory runtime
    pub fn with_ports(
        config: &ClipcutConfig,
        loader: Arc<dyn RuntimeLoader>,
        probe_port: Arc<dyn ProbePort>,
    ) -> Result<Self, DomainError> {
        config.validate()?;

        let engine = Arc::new(ClipExtractionEngine::new(loader, config.engine_config()));
        let clip_interactor = Arc::new(ClipInteractor::new(Arc::clone(&engine)));
        let inspect_interactor = Arc::new(InspectInteractor::new(Arc::clone(&probe_port)));
        let verify_interactor = Arc::new(VerifyInteractor::new(probe_port));

        Ok(Self {
            engine,
            clip_interactor,
            inspect_interactor,
            verify_interactor,
        })
    }
}

impl AppContainer for DefaultAppContainer {
    fn engine(&self) -> Arc<ClipExtractionEngine> {
        Arc::clone(&self.engine)
    }

    fn clip_interactor(&self) -> Arc<ClipInteractor> {
        Arc::clone(&self.clip_interactor)
    }

    fn inspect_interactor(&self) -> Arc<InspectInteractor> {
        Arc::clone(&self.inspect_interactor)
    }

    fn verify_interactor(&self) -> Arc<VerifyInteractor> {
        Arc::clone(&self.verify_interactor)
    }
}
