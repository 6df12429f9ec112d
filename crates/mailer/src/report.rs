//! Failure reporting hook.

use tracing::error;

use crate::error::MailError;

/// Receives every failed mailer operation once, before the error is
/// returned to the caller.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, operation: &str, error: &MailError);
}

/// Default reporter: one `error!` event per failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, operation: &str, error: &MailError) {
        error!(operation, error = %error, "mail operation failed");
    }
}

impl<F> ErrorReporter for F
where
    F: Fn(&str, &MailError) + Send + Sync,
{
    fn report(&self, operation: &str, error: &MailError) {
        self(operation, error)
    }
}
