use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::LoadError;
use crate::models::{AttemptBundle, AttemptRecord, Domain};

/// Read-only access to one category of attempts.
///
/// A user with no attempts yields an empty list, never an error.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn find_attempts_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<AttemptRecord>>;
}

#[derive(Clone)]
pub struct AttemptLoader {
    exams: Arc<dyn AttemptStore>,
    practices: Arc<dyn AttemptStore>,
    quizzes: Arc<dyn AttemptStore>,
    aptitudes: Arc<dyn AttemptStore>,
}

impl AttemptLoader {
    pub fn new(
        exams: Arc<dyn AttemptStore>,
        practices: Arc<dyn AttemptStore>,
        quizzes: Arc<dyn AttemptStore>,
        aptitudes: Arc<dyn AttemptStore>,
    ) -> Self {
        Self {
            exams,
            practices,
            quizzes,
            aptitudes,
        }
    }

    /// Fetches all four categories concurrently. The first failure aborts the
    /// load; no partial bundle is returned.
    pub async fn load(&self, user_id: Uuid) -> Result<AttemptBundle, LoadError> {
        let result = tokio::try_join!(
            fetch(self.exams.as_ref(), Domain::Exam, user_id),
            fetch(self.practices.as_ref(), Domain::Practice, user_id),
            fetch(self.quizzes.as_ref(), Domain::Quiz, user_id),
            fetch(self.aptitudes.as_ref(), Domain::Aptitude, user_id),
        );

        match result {
            Ok((exams, practices, quizzes, aptitudes)) => Ok(AttemptBundle {
                exams,
                practices,
                quizzes,
                aptitudes,
            }),
            Err(err) => {
                error!(%user_id, domain = %err.domain(), "attempt load failed: {err}");
                Err(err)
            }
        }
    }
}

async fn fetch(
    store: &dyn AttemptStore,
    domain: Domain,
    user_id: Uuid,
) -> Result<Vec<AttemptRecord>, LoadError> {
    let records = store
        .find_attempts_by_user(user_id)
        .await
        .map_err(|err| LoadError::Fetch {
            domain,
            source: err.into(),
        })?;
    debug!(%user_id, %domain, count = records.len(), "attempts fetched");
    Ok(records)
}
