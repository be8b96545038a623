use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::{FutureExt, StreamExt, stream};
use tracing::{error, instrument, warn};

use super::types::check_batch_len;
use super::{BatchResult, RequestError, ValidationOptions, ValidationRequest, ValidationResult, Validator};
use crate::rate_limit::Tier;

impl Validator {
    /// Validates up to `max_batch` addresses, at most `batch_size` at a time.
    ///
    /// Results come back in input order. A panic while validating one
    /// address is caught and reported in that address's slot only.
    #[instrument(skip_all, fields(count = emails.len()))]
    pub async fn validate_batch(
        &self,
        emails: &[String],
        options: &ValidationOptions,
    ) -> Result<BatchResult, RequestError> {
        check_batch_len(emails.len(), self.inner.pipeline.max_batch)?;

        let mut slots: Vec<Option<ValidationResult>> = vec![None; emails.len()];
        let mut running = stream::iter(emails.iter().enumerate())
            .map(|(index, email)| async move {
                let outcome = AssertUnwindSafe(self.validate_one(email, options))
                    .catch_unwind()
                    .await;
                (index, outcome)
            })
            .buffer_unordered(options.batch_size.max(1));

        while let Some((index, outcome)) = running.next().await {
            let result = outcome.unwrap_or_else(|panic| {
                let message = panic_message(panic.as_ref());
                error!(email = %emails[index], error = %message, "validation pipeline panicked");
                metrics::counter!("mailrisk_validations_total", "outcome" => "error").increment(1);
                ValidationResult::errored(&emails[index], message)
            });
            slots[index] = Some(result);
        }

        let results = slots
            .into_iter()
            .zip(emails)
            .map(|(slot, email)| {
                slot.unwrap_or_else(|| ValidationResult::errored(email, "validation did not complete"))
            })
            .collect();
        Ok(BatchResult::new(results))
    }

    /// Admits `request` through the rate gate, then validates it.
    ///
    /// A failing rate-limit backend refuses the request, unless
    /// `rate_limit.fail_open` is set.
    #[instrument(skip(self, request), fields(count = request.emails().len()))]
    pub async fn submit(
        &self,
        client_key: &str,
        tier: Tier,
        request: ValidationRequest,
    ) -> Result<BatchResult, RequestError> {
        match self.inner.gate.check_and_consume(client_key, tier).await {
            Ok(decision) if !decision.allowed => {
                warn!(reset_at = %decision.reset_at, "request rate limited");
                return Err(RequestError::RateLimited {
                    tier,
                    reset_at: decision.reset_at,
                });
            }
            Ok(_) => {}
            Err(err) if self.inner.rate_limit.fail_open => {
                warn!(error = %err, "rate gate unavailable, admitting request");
            }
            Err(err) => {
                warn!(error = %err, "rate gate unavailable, refusing request");
                return Err(RequestError::RateGateUnavailable(err.to_string()));
            }
        }
        self.validate_batch(request.emails(), request.options()).await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("validation failed: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("validation failed: {message}")
    } else {
        "validation failed".to_string()
    }
}
