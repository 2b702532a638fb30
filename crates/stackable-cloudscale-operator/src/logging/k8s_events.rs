//! Utilities for publishing Kubernetes events

use std::error::Error;

use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::{
    controller,
    events::{Event, EventType, Recorder, Reporter},
};
use tracing::Instrument;

use super::controller::ReconcilerError;
use crate::client::Client;

/// Maximum length of an event note in bytes, as accepted by the API server.
const MAX_NOTE_LEN: usize = 1024;

/// Builds a `Warning` event from a reconciler error, with the whole error
/// chain as note.
fn error_to_event<E: ReconcilerError>(err: &E) -> Event {
    let mut note = std::iter::successors(Some(err as &dyn Error), |&err| err.source())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ");
    message::truncate_with_ellipsis(&mut note, MAX_NOTE_LEN);

    Event {
        type_: EventType::Warning,
        reason: err.category().to_owned(),
        note: Some(note),
        action: "Reconcile".to_owned(),
        secondary: err.secondary_object().map(Into::into),
    }
}

/// Publishes a failed reconciliation as event on the reconciled object.
///
/// Publishing happens in the background. Errors of the controller machinery
/// are not tied to an object and are skipped.
#[tracing::instrument(skip(client, controller_error))]
pub fn publish_controller_error_as_k8s_event<ReconcileErr, QueueErr>(
    client: &Client,
    controller: &str,
    controller_error: &controller::Error<ReconcileErr, QueueErr>,
) where
    ReconcileErr: ReconcilerError,
    QueueErr: Error,
{
    let (error, obj) = match controller_error {
        controller::Error::ReconcilerFailed(err, obj) => (err, obj),
        _ => return,
    };
    let recorder = Recorder::new(client.as_kube_client(), Reporter {
        controller: controller.to_string(),
        instance: None,
    });
    let reference: ObjectReference = obj.clone().into();
    let event = error_to_event(error);
    tokio::spawn(
        async move {
            if let Err(err) = recorder.publish(&event, &reference).await {
                tracing::error!(
                    error = &err as &dyn std::error::Error,
                    "Failed to report error as K8s event"
                );
            }
        }
        .in_current_span(),
    );
}

mod message {
    /// Ensures that `msg` is at most `max_len` _bytes_ long
    ///
    /// If `msg` is longer than `max_len` then the extra text is replaced with an ellipsis.
    pub fn truncate_with_ellipsis(msg: &mut String, max_len: usize) {
        const ELLIPSIS: char = '…';
        const ELLIPSIS_LEN: usize = ELLIPSIS.len_utf8();
        if msg.len() > max_len {
            let start_of_trunc_char = find_start_of_char(msg, max_len.saturating_sub(ELLIPSIS_LEN));
            msg.truncate(start_of_trunc_char);
            if ELLIPSIS_LEN <= max_len {
                msg.push(ELLIPSIS);
            }
        }
        debug_assert!(msg.len() <= max_len);
    }

    fn find_start_of_char(s: &str, mut pos: usize) -> usize {
        while !s.is_char_boundary(pos) {
            pos -= 1;
        }
        pos
    }

    #[cfg(test)]
    mod tests {
        use super::truncate_with_ellipsis;

        #[test]
        fn truncate_should_be_noop_if_string_fits() {
            let mut x = "hello".to_string();
            truncate_with_ellipsis(&mut x, 5);
            assert_eq!(&x, "hello");
        }

        #[test]
        fn truncate_should_ellipsize_large_string() {
            let mut x = "cannot get Provider secret default/cloudscale".to_string();
            truncate_with_ellipsis(&mut x, 7);
            assert_eq!(&x, "cann…");
        }

        #[test]
        fn truncate_should_ellipsize_emoji() {
            let mut x = "bucket🪣".to_string();
            truncate_with_ellipsis(&mut x, 9);
            assert_eq!(&x, "bucket…");
        }
    }
}

#[cfg(test)]
mod tests {
    use snafu::Snafu;

    use super::*;

    #[derive(Debug, Snafu)]
    enum TestError {
        #[snafu(display("cannot get bucket"))]
        GetBucket { source: std::io::Error },
    }

    impl ReconcilerError for TestError {
        fn category(&self) -> &'static str {
            "GetBucket"
        }
    }

    #[test]
    fn event_contains_error_chain() {
        let error = TestError::GetBucket {
            source: std::io::Error::other("connection reset"),
        };
        let event = error_to_event(&error);

        assert!(matches!(event.type_, EventType::Warning));
        assert_eq!(event.reason, "GetBucket");
        assert_eq!(
            event.note.as_deref(),
            Some("cannot get bucket: connection reset")
        );
    }
}
