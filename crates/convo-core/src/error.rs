use convo_types::models::ValidationError;

/// Errors surfaced by core operations.
///
/// "Nothing to digest" is not a variant: per-container digest generation
/// returns `Ok(None)` for it and the engine skips the container.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Lookup missed. Carries the entity kind.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Precondition violated, e.g. merging a user that was never saved.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The caller may not touch this entity. Reported like a miss so the
    /// entity's existence does not leak.
    #[error("no permission")]
    Forbidden,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Mail collaborator failed. Nothing was marked read.
    #[error("delivery failed: {0:#}")]
    Delivery(anyhow::Error),

    /// A multi-entity write failed and was rolled back.
    #[error("transaction failed: {0:#}")]
    Transaction(anyhow::Error),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_entity() {
        assert_eq!(CoreError::NotFound("thread").to_string(), "thread not found");
    }

    #[test]
    fn validation_error_displays_inner() {
        let err = CoreError::from(ValidationError::SelfContact);
        assert_eq!(err.to_string(), "You cannot add yourself as a contact");
    }

    #[test]
    fn transaction_error_includes_cause_chain() {
        let cause = anyhow::anyhow!("disk full").context("put events");
        let err = CoreError::Transaction(cause);
        let text = err.to_string();
        assert!(text.contains("put events"));
        assert!(text.contains("disk full"));
    }

    const _: () = {
        #[allow(dead_code)]
        fn assert_send_sync<T: Send + Sync>() {}

        #[allow(dead_code)]
        fn check() {
            assert_send_sync::<CoreError>();
        }
    };
}
