//! Concurrent message hydration
//!
//! One listing call, then one fetch-and-decode unit per listed message on a
//! dedicated rayon pool. Every unit reports exactly one [`Outcome`], and
//! rayon's indexed collect is the barrier: results are gathered in listing
//! order only after all units have finished, then sorted newest first.

use log::{debug, error, info, warn};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{MailxError, Result};
use crate::gmail::api::MessageRef;
use crate::gmail::hydrate_message;
use crate::models::{Message, MessageId, UserId};
use crate::session::Session;

/// Request-scoped cancellation flag with an optional deadline
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that cancels itself once `timeout` has elapsed
    pub fn with_deadline(timeout: Duration) -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Result reported by a single fan-out unit
enum Outcome {
    Hydrated(Message),
    Failed,
    /// Cancellation was observed before the fetch started
    Abandoned,
}

/// Fetch one message with its full payload and decode its HTML body
pub fn fetch_message(
    session: &dyn Session,
    user_id: &UserId,
    message_id: &MessageId,
) -> Result<Message> {
    let gmail_msg = session
        .messages()
        .get(user_id, message_id)
        .execute()
        .map_err(|source| MailxError::Fetch {
            message_id: message_id.clone(),
            source,
        })?;

    hydrate_message(gmail_msg)
}

/// Fan-out/fan-in over a bounded pool of fetch workers
pub struct Hydrator {
    pool: rayon::ThreadPool,
}

impl Hydrator {
    /// Create a hydrator with `workers` fetch threads (at least one)
    pub fn new(workers: usize) -> anyhow::Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("mailx-fetch-{}", i))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build fetch thread pool: {}", e))?;

        Ok(Self { pool })
    }

    /// Upper bound on fetches in flight at once
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// List up to `limit` messages and hydrate them concurrently
    ///
    /// A listing failure is returned as [`MailxError::List`]. Per-message
    /// fetch and decode failures are logged and the message is left out.
    /// The result is sorted by `internal_date`, newest first; the sort is
    /// stable, so ties keep their listing order.
    pub fn hydrate_messages(
        &self,
        session: &dyn Session,
        user_id: &UserId,
        limit: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<Message>> {
        if cancel.is_cancelled() {
            return Err(MailxError::Cancelled);
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let listing = session
            .messages()
            .list(user_id, limit)
            .execute()
            .map_err(|source| {
                error!("Failed to list messages for user {}: {}", user_id, source);
                MailxError::List {
                    user_id: user_id.clone(),
                    source,
                }
            })?;

        let mut refs = listing.messages.unwrap_or_default();
        refs.truncate(limit);
        debug!("Listed {} messages for user {}", refs.len(), user_id);

        let outcomes: Vec<Outcome> = self.pool.install(|| {
            refs.par_iter()
                .map(|message_ref| hydrate_one(session, user_id, message_ref, cancel))
                .collect()
        });

        let listed = outcomes.len();
        let mut messages = Vec::with_capacity(listed);
        let mut failed = 0;
        let mut abandoned = 0;
        for outcome in outcomes {
            match outcome {
                Outcome::Hydrated(message) => messages.push(message),
                Outcome::Failed => failed += 1,
                Outcome::Abandoned => abandoned += 1,
            }
        }

        if abandoned > 0 {
            warn!(
                "Hydration for user {} cancelled with {} of {} messages unfetched",
                user_id, abandoned, listed
            );
            return Err(MailxError::Cancelled);
        }

        messages.sort_by(|a, b| b.internal_date.cmp(&a.internal_date));

        info!(
            "Hydrated {} of {} messages for user {} ({} failed)",
            messages.len(),
            listed,
            user_id,
            failed
        );
        Ok(messages)
    }
}

fn hydrate_one(
    session: &dyn Session,
    user_id: &UserId,
    message_ref: &MessageRef,
    cancel: &CancelToken,
) -> Outcome {
    if cancel.is_cancelled() {
        return Outcome::Abandoned;
    }

    let message_id = MessageId::new(message_ref.id.as_str());
    match fetch_message(session, user_id, &message_id) {
        Ok(message) => Outcome::Hydrated(message),
        Err(e) => {
            warn!("Dropping message {} for user {}: {}", message_id, user_id, e);
            Outcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::gmail::api::MessagePartBody;
    use crate::session::fake::{FakeSession, gmail_message};
    use std::collections::HashSet;

    fn user() -> UserId {
        UserId::new("u1")
    }

    fn ids(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.id.as_str()).collect()
    }

    fn hydrate(session: &FakeSession, limit: usize) -> Result<Vec<Message>> {
        Hydrator::new(4)
            .unwrap()
            .hydrate_messages(session, &user(), limit, &CancelToken::new())
    }

    #[test]
    fn test_sorted_newest_first() {
        let session = FakeSession::with_messages(vec![
            gmail_message("a", 100, Some("<p>a</p>")),
            gmail_message("b", 300, Some("<p>b</p>")),
            gmail_message("c", 200, Some("<p>c</p>")),
        ]);

        let messages = hydrate(&session, 10).unwrap();
        assert_eq!(ids(&messages), vec!["b", "c", "a"]);
        assert_eq!(messages[0].html, "<p>b</p>");
    }

    #[test]
    fn test_returns_only_successful_fetches() {
        let session = FakeSession::with_messages(vec![
            gmail_message("a", 100, None),
            gmail_message("b", 400, None),
            gmail_message("c", 300, None),
            gmail_message("d", 200, None),
        ])
        .failing("b")
        .failing("d");

        let messages = hydrate(&session, 10).unwrap();
        assert_eq!(ids(&messages), vec!["c", "a"]);
        assert_eq!(session.gets.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_one_failure_keeps_the_rest() {
        let session = FakeSession::with_messages(vec![
            gmail_message("a", 100, None),
            gmail_message("b", 200, None),
            gmail_message("c", 300, None),
        ])
        .failing("b");

        let messages = hydrate(&session, 10).unwrap();
        assert_eq!(ids(&messages), vec!["c", "a"]);
    }

    #[test]
    fn test_undecodable_message_is_dropped() {
        let mut broken = gmail_message("bad", 500, None);
        if let Some(parts) = broken.payload.as_mut().and_then(|p| p.parts.as_mut()) {
            parts[0].mime_type = Some("text/html".to_string());
            parts[0].body = Some(MessagePartBody {
                data: Some("%%%".to_string()),
                ..Default::default()
            });
        }
        let session =
            FakeSession::with_messages(vec![broken, gmail_message("ok", 100, Some("<p>ok</p>"))]);

        let messages = hydrate(&session, 10).unwrap();
        assert_eq!(ids(&messages), vec!["ok"]);
    }

    #[test]
    fn test_listing_failure_is_fatal() {
        let session = FakeSession::with_messages(vec![gmail_message("a", 100, None)])
            .list_error(ApiError::RateLimited);

        let err = hydrate(&session, 10).unwrap_err();
        assert!(matches!(
            err,
            MailxError::List {
                source: ApiError::RateLimited,
                ..
            }
        ));
        assert_eq!(session.gets.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_limit_bounds_listing() {
        let session = FakeSession::with_messages(
            (0..5)
                .map(|i| gmail_message(&format!("m{}", i), i, None))
                .collect(),
        );

        let messages = hydrate(&session, 2).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(session.gets.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_zero_limit_makes_no_calls() {
        let session = FakeSession::with_messages(vec![gmail_message("a", 100, None)]);

        assert!(hydrate(&session, 0).unwrap().is_empty());
        assert_eq!(session.lists.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_ties_keep_listing_order() {
        let session = FakeSession::with_messages(vec![
            gmail_message("x", 100, None),
            gmail_message("y", 100, None),
            gmail_message("z", 100, None),
        ])
        .jitter(5);

        for _ in 0..5 {
            assert_eq!(ids(&hydrate(&session, 10).unwrap()), vec!["x", "y", "z"]);
        }
    }

    #[test]
    fn test_hydration_is_idempotent() {
        let session = FakeSession::with_messages(
            (0..12)
                .map(|i| gmail_message(&format!("m{}", i), (i * 37) % 11, Some("<p>x</p>")))
                .collect(),
        );

        let first = hydrate(&session, 20).unwrap();
        let second = hydrate(&session, 20).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_random_latency_has_no_duplicates_or_gaps() {
        let session = FakeSession::with_messages(
            (0..40)
                .map(|i| gmail_message(&format!("m{}", i), i * 10, None))
                .collect(),
        )
        .jitter(8);
        let hydrator = Hydrator::new(8).unwrap();

        for _ in 0..5 {
            let messages = hydrator
                .hydrate_messages(&session, &user(), 40, &CancelToken::new())
                .unwrap();
            let unique: HashSet<&str> = messages.iter().map(|m| m.id.as_str()).collect();
            assert_eq!(messages.len(), 40);
            assert_eq!(unique.len(), 40);
            assert!(messages.windows(2).all(|w| w[0].internal_date >= w[1].internal_date));
        }
    }

    #[test]
    fn test_cancelled_before_start() {
        let session = FakeSession::with_messages(vec![gmail_message("a", 100, None)]);
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = Hydrator::new(2)
            .unwrap()
            .hydrate_messages(&session, &user(), 10, &cancel);
        assert!(matches!(result, Err(MailxError::Cancelled)));
        assert_eq!(session.lists.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_expired_deadline_cancels() {
        let cancel = CancelToken::with_deadline(Duration::ZERO);
        assert!(cancel.is_cancelled());
        assert!(!CancelToken::with_deadline(Duration::from_secs(60)).is_cancelled());
    }

    #[test]
    fn test_cancel_during_fan_out_abandons_remaining_units() {
        let session = FakeSession::with_messages(
            (0..30)
                .map(|i| gmail_message(&format!("m{}", i), i, None))
                .collect(),
        )
        .jitter(20);
        let cancel = CancelToken::with_deadline(Duration::from_millis(15));

        let result = Hydrator::new(1)
            .unwrap()
            .hydrate_messages(&session, &user(), 30, &cancel);
        assert!(matches!(result, Err(MailxError::Cancelled)));
        assert!(session.gets.load(Ordering::SeqCst) < 30);
    }

    #[test]
    fn test_fetch_message_not_found() {
        let session = FakeSession::empty();
        let err = fetch_message(&session, &user(), &MessageId::new("nope")).unwrap_err();
        assert!(matches!(
            err,
            MailxError::Fetch {
                source: ApiError::NotFound,
                ..
            }
        ));
        assert!(!err.should_rebuild_session());
    }

    #[test]
    fn test_worker_count() {
        assert_eq!(Hydrator::new(3).unwrap().workers(), 3);
        assert_eq!(Hydrator::new(0).unwrap().workers(), 1);
    }
}
