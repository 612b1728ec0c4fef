//! Webhook endpoint
//!
//! Reads the raw body, hands it to the rebuild trigger together with the
//! signature header, and acknowledges with an empty 200 whatever the outcome.

use crate::http::{self, HttpResponse};
use crate::logger;
use crate::rebuild::{RebuildTrigger, TriggerOutcome, SIGNATURE_HEADER};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::Request;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Handle a POST on the webhook path
pub async fn handle_webhook<B>(
    req: Request<B>,
    trigger: &RebuildTrigger,
    max_body_size: u64,
) -> HttpResponse
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .map(|v| v.as_bytes().to_vec());

    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let body = match Limited::new(req.into_body(), limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_warning(&format!(
                "Webhook body exceeds {max_body_size} bytes, delivery refused"
            ));
            return http::build_413_response();
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to read webhook body: {e}"));
            return http::build_empty_response();
        }
    };

    match trigger.handle(&body, signature.as_deref()).await {
        TriggerOutcome::Completed(report) => {
            tracing::debug!(
                pull_lines = report.pull.lines.len(),
                build_lines = report.build.lines.len(),
                succeeded = report.succeeded(),
                "Webhook rebuild completed"
            );
        }
        TriggerOutcome::Scheduled => tracing::info!("Webhook rebuild scheduled in background"),
        TriggerOutcome::Rejected(_) | TriggerOutcome::Busy => {}
    }

    http::build_empty_response()
}
