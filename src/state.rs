//! Shared application state for all routes.

use crate::comments::CommentLogic;
use crate::registration::RegistrationStatus;
use std::sync::Arc;

pub struct AppState<S> {
    pub logic: Arc<CommentLogic<S>>,
    /// Fixed once startup has attempted registration.
    pub registration: Arc<RegistrationStatus>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        AppState {
            logic: Arc::clone(&self.logic),
            registration: Arc::clone(&self.registration),
        }
    }
}

impl<S> AppState<S> {
    pub fn new(logic: CommentLogic<S>, registration: RegistrationStatus) -> Self {
        AppState {
            logic: Arc::new(logic),
            registration: Arc::new(registration),
        }
    }
}
