pub mod award;
pub mod jwt;
pub mod notify;
pub mod rating;

#[cfg(test)]
pub mod testing;

pub use award::AwardService;
pub use jwt::JwtService;
pub use notify::{EmailNotifier, Notifier};
pub use rating::RatingService;

use std::sync::Arc;

use crate::store::MarketStore;

/// The core services, shared through Rocket's managed state.
pub struct CoreServices {
    pub award: AwardService,
    pub rating: RatingService,
    pub notifier: Arc<dyn Notifier>,
}

impl CoreServices {
    pub fn new(store: Arc<dyn MarketStore>, notifier: Arc<dyn Notifier>) -> Self {
        CoreServices {
            award: AwardService::new(store.clone(), notifier.clone()),
            rating: RatingService::new(store, notifier.clone()),
            notifier,
        }
    }
}
