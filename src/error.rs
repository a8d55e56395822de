use thiserror::Error;

use crate::models::Domain;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to load {domain} attempts: {source}")]
    Fetch {
        domain: Domain,
        #[source]
        source: BoxError,
    },
}

impl LoadError {
    pub fn domain(&self) -> Domain {
        match self {
            LoadError::Fetch { domain, .. } => *domain,
        }
    }
}
