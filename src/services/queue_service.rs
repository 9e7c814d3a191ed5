use tracing::info;

use crate::{
    dto::{
        CourtId, MatchType,
        queue::{JoinQueueRequest, LeaveQueueRequest},
    },
    error::ServiceError,
    services::{
        court_session::{court_snapshot, remote},
        require_viewer,
    },
    state::{
        ActionTarget, SharedState,
        lifecycle::{QueueEvent, QueueLifecycle},
        model::QueueEntry,
        state_machine::StateMachine,
        transitions::run_transition_with_reload,
    },
};

async fn queue_machine(
    state: &SharedState,
    court_id: CourtId,
) -> Result<StateMachine<QueueLifecycle>, ServiceError> {
    let viewer = require_viewer(state)?;
    let snapshot = court_snapshot(state, court_id).await?;
    let queued = snapshot
        .queue_entry_of(viewer)
        .map(|entry| entry.match_type);
    Ok(StateMachine::new(QueueLifecycle::new(queued)))
}

/// Join the ranked queue of `court_id`.
pub async fn join_queue(
    state: &SharedState,
    court_id: CourtId,
    match_type: MatchType,
) -> Result<Option<QueueEntry>, ServiceError> {
    let machine = queue_machine(state, court_id).await?;
    run_transition_with_reload(
        state,
        ActionTarget::Queue(court_id),
        machine,
        QueueEvent::Join(match_type),
        move || async move {
            let response = remote(
                state,
                state.api().join_queue(JoinQueueRequest {
                    court_id,
                    match_type,
                }),
            )
            .await?;
            info!(court_id = %court_id, ?match_type, "joined ranked queue");
            Ok(response.entry.map(QueueEntry::from))
        },
    )
    .await
}

pub async fn leave_queue(state: &SharedState, court_id: CourtId) -> Result<(), ServiceError> {
    let machine = queue_machine(state, court_id).await?;
    run_transition_with_reload(
        state,
        ActionTarget::Queue(court_id),
        machine,
        QueueEvent::Leave,
        move || async move {
            remote(state, state.api().leave_queue(LeaveQueueRequest { court_id })).await?;
            info!(court_id = %court_id, "left ranked queue");
            Ok(())
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::dto::UserId;
    use crate::error::ACTION_IN_PROGRESS;
    use crate::services::{scheduler::refresh_now, test_support::MockRankedApi};
    use crate::state::{lifecycle::ActionKind, tests::state_with};

    #[tokio::test(start_paused = true)]
    async fn concurrent_joins_send_one_request() {
        let api = Arc::new(MockRankedApi::default());
        api.delay("join_queue", Duration::from_secs(1));
        let state = state_with(api.clone(), Some(1));
        state.set_open_court(Some(CourtId(3))).await;

        let (first, second) = tokio::join!(
            join_queue(&state, CourtId(3), MatchType::Singles),
            join_queue(&state, CourtId(3), MatchType::Singles),
        );

        assert_eq!(api.calls("join_queue"), 1);
        assert_eq!(api.queue.lock().unwrap().len(), 1);
        let failures: Vec<String> = [first, second]
            .into_iter()
            .filter_map(|outcome| outcome.err().map(|err| err.to_string()))
            .collect();
        assert_eq!(failures.len(), 1);
        assert!(
            failures[0].contains(ACTION_IN_PROGRESS)
                || failures[0] == "Already in queue at this court",
            "{failures:?}"
        );

        let snapshot = state.snapshot().await.unwrap();
        assert!(snapshot.queue_entry_of(UserId(1)).is_some());
        assert!(state.pending_targets().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn queue_stays_reserved_until_the_reload_lands() {
        let api = Arc::new(MockRankedApi::default());
        let state = state_with(api.clone(), Some(1));
        state.set_open_court(Some(CourtId(3))).await;
        refresh_now(&state).await.unwrap();
        api.delay("queue", Duration::from_secs(1));

        let second = async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            join_queue(&state, CourtId(3), MatchType::Doubles).await
        };
        let (first, second) = tokio::join!(
            join_queue(&state, CourtId(3), MatchType::Singles),
            second,
        );

        first.unwrap();
        assert!(second.unwrap_err().to_string().contains(ACTION_IN_PROGRESS));
        assert_eq!(api.calls("join_queue"), 1);
        assert!(state.pending_targets().is_empty());
        let view = state.renderer().lock().await.last().cloned().unwrap();
        assert!(!view.court_busy);
        assert_eq!(view.court_actions, vec![ActionKind::LeaveQueue]);
    }

    #[tokio::test]
    async fn join_then_leave_updates_the_snapshot() {
        let api = Arc::new(MockRankedApi::default());
        let state = state_with(api.clone(), Some(1));
        state.set_open_court(Some(CourtId(3))).await;

        let entry = join_queue(&state, CourtId(3), MatchType::Doubles)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.match_type, MatchType::Doubles);

        let err = join_queue(&state, CourtId(3), MatchType::Singles)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Already in queue at this court");
        assert_eq!(api.calls("join_queue"), 1);

        leave_queue(&state, CourtId(3)).await.unwrap();
        assert!(state.snapshot().await.unwrap().queue.is_empty());
    }

    #[tokio::test]
    async fn leaving_without_an_entry_sends_nothing() {
        let api = Arc::new(MockRankedApi::default());
        let state = state_with(api.clone(), Some(1));
        state.set_open_court(Some(CourtId(3))).await;

        let err = leave_queue(&state, CourtId(3)).await.unwrap_err();
        assert_eq!(err.to_string(), "You are not in the queue at this court");
        assert_eq!(api.calls("leave_queue"), 0);
    }

    #[tokio::test]
    async fn anonymous_viewer_cannot_queue() {
        let api = Arc::new(MockRankedApi::default());
        let state = state_with(api.clone(), None);

        let err = join_queue(&state, CourtId(3), MatchType::Singles)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
        assert_eq!(api.total_calls(), 0);
    }
}
