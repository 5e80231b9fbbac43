// Application layer - Use case interactors

pub mod clip_interactor;
pub mod container;
pub mod inspect_interactor;
pub mod verify_interactor;

// Re-export interactors
pub use clip_interactor::{ClipFailure, ClipInteractor, ClipJob, ClipReport};
pub use container::{AppContainer, DefaultAppContainer};
pub use inspect_interactor::InspectInteractor;
pub use verify_interactor::{VerifyInteractor, VerifyReport, VerifyRequest};
