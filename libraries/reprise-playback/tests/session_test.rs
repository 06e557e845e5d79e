//! Playback session state machine tests
//!
//! Drive a `PlaybackSession` directly against mock audio collaborators and
//! check transitions, notices and what lands in the store.

mod common;

use common::{config, fixture, seed_tracks};
use reprise_core::{PlaylistStore, TrackId, TrackStore};
use reprise_playback::timers::TimerKind;
use reprise_playback::{
    FocusChange, Notice, PlaybackError, PlaybackEvent, PlaybackSession, PlaybackState,
};

fn current(session: &PlaybackSession) -> Option<TrackId> {
    session.queue().peek_current().map(|t| t.id.clone())
}

fn stack(session: &PlaybackSession) -> Vec<TrackId> {
    session
        .queue()
        .session()
        .map(|q| q.stack().to_vec())
        .unwrap_or_default()
}

fn notices(events: &[PlaybackEvent]) -> Vec<Notice> {
    events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::Notice(notice) => Some(notice.clone()),
            _ => None,
        })
        .collect()
}

// ===== Transport =====

#[tokio::test]
async fn test_select_track_starts_playback() {
    let fx = fixture(3).await;
    let (mut session, _timers) = fx.session();

    session.select_track(fx.playlist, &fx.id(1), 0).await.unwrap();

    assert_eq!(session.state(), PlaybackState::Playing);
    assert_eq!(fx.engine.loaded(), Some(fx.id(1)));
    assert!(fx.engine.is_playing());
    assert_eq!(fx.focus.requests(), 1);

    let playlist = fx.checkpoint().await;
    assert_eq!(playlist.last_played_track_id, Some(fx.id(1)));
    let saved = fx.saved_session().await;
    assert_eq!(saved.active_playlist_id, Some(fx.playlist));
    assert!(saved.was_playing);

    let events = session.take_events();
    assert!(events.contains(&PlaybackEvent::StateChanged {
        state: PlaybackState::Playing
    }));
    assert!(events.contains(&PlaybackEvent::PlaylistChanged {
        playlist_id: Some(fx.playlist)
    }));
    assert!(events.contains(&PlaybackEvent::TrackChanged {
        track_id: fx.id(1),
        previous_track_id: None,
    }));
    assert!(session.take_events().is_empty());
}

#[tokio::test]
async fn test_select_track_at_offset() {
    let fx = fixture(2).await;
    let (mut session, _timers) = fx.session();

    session
        .select_track(fx.playlist, &fx.id(0), 45_000)
        .await
        .unwrap();

    assert_eq!(session.position_ms(), 45_000);
}

#[tokio::test]
async fn test_select_unknown_track_fails() {
    let fx = fixture(2).await;
    let (mut session, _timers) = fx.session();

    let err = session
        .select_track(fx.playlist, &TrackId::new("/music/nope.flac"), 0)
        .await
        .unwrap_err();

    assert!(matches!(err, PlaybackError::InvalidOperation(_)));
    assert_eq!(session.state(), PlaybackState::Stopped);
}

#[tokio::test]
async fn test_pause_saves_position_and_releases_focus() {
    let fx = fixture(3).await;
    let (mut session, _timers) = fx.playing_at(0).await;

    fx.engine.advance_to(42_000);
    session.pause().await.unwrap();

    assert_eq!(session.state(), PlaybackState::Paused);
    assert!(!fx.engine.is_playing());
    assert_eq!(fx.focus.abandons(), 1);

    let playlist = fx.checkpoint().await;
    assert_eq!(playlist.last_played_track_id, Some(fx.id(0)));
    assert_eq!(playlist.last_played_position_ms, 42_000);
    assert!(!fx.saved_session().await.was_playing);
}

#[tokio::test]
async fn test_play_resumes_paused_track() {
    let fx = fixture(3).await;
    let (mut session, _timers) = fx.playing_at(2).await;

    fx.engine.advance_to(10_000);
    session.pause().await.unwrap();
    session.play().await.unwrap();

    assert_eq!(session.state(), PlaybackState::Playing);
    // Resuming does not reload
    assert_eq!(fx.engine.loads(), vec![fx.id(2)]);
    assert_eq!(session.position_ms(), 10_000);
    assert_eq!(fx.focus.requests(), 2);
}

#[tokio::test]
async fn test_stop_then_play_resumes_position() {
    let fx = fixture(3).await;
    let (mut session, _timers) = fx.playing_at(0).await;

    fx.engine.advance_to(50_000);
    session.stop().await.unwrap();

    assert_eq!(session.state(), PlaybackState::Stopped);
    assert_eq!(fx.engine.stops(), 1);
    assert_eq!(fx.engine.loaded(), None);
    assert_eq!(fx.checkpoint().await.last_played_position_ms, 50_000);

    session.play().await.unwrap();

    assert_eq!(session.state(), PlaybackState::Playing);
    assert_eq!(fx.engine.loaded(), Some(fx.id(0)));
    assert_eq!(session.position_ms(), 50_000);
}

#[tokio::test]
async fn test_play_without_playlist_reports_empty_queue() {
    let fx = fixture(3).await;
    let (mut session, _timers) = fx.session();

    let err = session.play().await.unwrap_err();

    assert!(matches!(err, PlaybackError::EmptyQueue));
    assert_eq!(session.state(), PlaybackState::Stopped);
    assert_eq!(notices(&session.take_events()), vec![Notice::EmptyQueue]);
}

#[tokio::test]
async fn test_seek_clamps_to_duration() {
    let fx = fixture(1).await;
    let (mut session, _timers) = fx.playing_at(0).await;

    session.seek(999_999).await.unwrap();

    assert_eq!(session.position_ms(), 180_000);
    assert_eq!(fx.checkpoint().await.last_played_position_ms, 180_000);
}

#[tokio::test]
async fn test_skip_while_stopped_is_ignored() {
    let fx = fixture(3).await;
    let (mut session, _timers) = fx.playing_at(0).await;
    session.stop().await.unwrap();
    session.take_events();

    session.skip_next().await.unwrap();

    assert_eq!(session.state(), PlaybackState::Stopped);
    assert_eq!(session.queue().peek_current().map(|t| t.id.clone()), Some(fx.id(0)));
    assert!(session.take_events().is_empty());
}

#[tokio::test]
async fn test_skip_while_paused_stays_paused() {
    let fx = fixture(3).await;
    let (mut session, _timers) = fx.playing_at(0).await;
    session.pause().await.unwrap();

    session.skip_next().await.unwrap();

    assert_eq!(session.state(), PlaybackState::Paused);
    assert_eq!(fx.engine.loaded(), Some(fx.id(1)));
    assert!(!fx.engine.is_playing());
}

#[tokio::test]
async fn test_skip_previous_wraps_to_last() {
    let fx = fixture(4).await;
    let (mut session, _timers) = fx.playing_at(0).await;

    session.skip_previous().await.unwrap();

    assert_eq!(fx.engine.loaded(), Some(fx.id(3)));
    assert_eq!(session.state(), PlaybackState::Playing);
}

// ===== Unreachable tracks =====

#[tokio::test]
async fn test_skip_passes_over_unreachable_tracks() {
    let fx = fixture(5).await;
    fx.probe.mark_unreachable(&fx.id(1));
    fx.probe.mark_unreachable(&fx.id(2));
    let (mut session, _timers) = fx.playing_at(0).await;
    session.take_events();

    session.skip_next().await.unwrap();

    assert_eq!(session.state(), PlaybackState::Playing);
    assert_eq!(fx.engine.loaded(), Some(fx.id(3)));
    assert_eq!(
        notices(&session.take_events()),
        vec![Notice::TracksSkipped {
            track_ids: vec![fx.id(1), fx.id(2)]
        }]
    );
}

#[tokio::test]
async fn test_skip_with_nothing_playable_stops() {
    let fx = fixture(3).await;
    let (mut session, _timers) = fx.playing_at(0).await;
    for i in 0..3 {
        fx.probe.mark_unreachable(&fx.id(i));
    }
    session.take_events();

    let err = session.skip_next().await.unwrap_err();

    assert!(matches!(err, PlaybackError::EmptyQueue));
    assert_eq!(session.state(), PlaybackState::Stopped);
    assert_eq!(fx.engine.loaded(), None);
    assert_eq!(notices(&session.take_events()), vec![Notice::EmptyQueue]);

    // Play gives up after one pass over the queue
    let err = session.play().await.unwrap_err();
    assert!(matches!(err, PlaybackError::EmptyQueue));
    assert_eq!(session.state(), PlaybackState::Stopped);
}

#[tokio::test]
async fn test_failed_play_keeps_the_starting_track() {
    let fx = fixture(3).await;
    let (mut session, _timers) = fx.playing_at(0).await;
    session.stop().await.unwrap();
    for i in 0..3 {
        fx.probe.mark_unreachable(&fx.id(i));
    }

    let err = session.play().await.unwrap_err();

    assert!(matches!(err, PlaybackError::EmptyQueue));
    assert_eq!(current(&session), Some(fx.id(0)));

    // The next attempt walks from the same place
    fx.probe.mark_reachable(&fx.id(0));
    session.play().await.unwrap();
    assert_eq!(fx.engine.loaded(), Some(fx.id(0)));
}

#[tokio::test]
async fn test_select_unreachable_track() {
    let fx = fixture(3).await;
    fx.probe.mark_unreachable(&fx.id(2));
    let (mut session, _timers) = fx.session();

    let err = session
        .select_track(fx.playlist, &fx.id(2), 0)
        .await
        .unwrap_err();

    assert!(matches!(err, PlaybackError::TrackUnreachable(ref id) if *id == fx.id(2)));
    assert_eq!(session.state(), PlaybackState::Stopped);
    assert_eq!(
        notices(&session.take_events()),
        vec![Notice::TrackUnreachable { track_id: fx.id(2) }]
    );
}

#[tokio::test]
async fn test_load_failure_stops() {
    let fx = fixture(2).await;
    fx.engine.fail_loads(true);
    let (mut session, _timers) = fx.session();

    let err = session
        .select_track(fx.playlist, &fx.id(0), 0)
        .await
        .unwrap_err();

    assert!(matches!(err, PlaybackError::Audio(_)));
    assert_eq!(session.state(), PlaybackState::Stopped);
    assert_eq!(fx.focus.abandons(), 1);
}

// ===== End of track =====

#[tokio::test]
async fn test_end_of_track_advances_then_pauses_at_end() {
    let fx = fixture(3).await;
    let (mut session, _timers) = fx.playing_at(1).await;

    session.track_ended().await.unwrap();
    assert_eq!(session.state(), PlaybackState::Playing);
    assert_eq!(fx.engine.loaded(), Some(fx.id(2)));

    // Last track: wrap to the top and wait there
    session.track_ended().await.unwrap();
    assert_eq!(session.state(), PlaybackState::Paused);
    assert_eq!(fx.engine.loaded(), Some(fx.id(0)));
    assert!(!fx.engine.is_playing());
    assert_eq!(fx.focus.abandons(), 1);
    assert_eq!(fx.checkpoint().await.last_played_track_id, Some(fx.id(0)));
}

#[tokio::test]
async fn test_end_of_track_with_repeat_one() {
    let fx = fixture(3).await;
    let (mut session, _timers) = fx.playing_at(1).await;
    session.set_repeat_one(true).await.unwrap();

    fx.engine.advance_to(180_000);
    session.track_ended().await.unwrap();

    assert_eq!(session.state(), PlaybackState::Playing);
    assert_eq!(fx.engine.loads(), vec![fx.id(1)]);
    assert_eq!(session.position_ms(), 0);
    assert!(fx.saved_session().await.repeat_one);
}

#[tokio::test]
async fn test_end_of_track_ignored_when_not_playing() {
    let fx = fixture(3).await;
    let (mut session, _timers) = fx.playing_at(0).await;
    session.pause().await.unwrap();

    session.track_ended().await.unwrap();

    assert_eq!(fx.engine.loaded(), Some(fx.id(0)));
}

// ===== Audio focus =====

#[tokio::test]
async fn test_focus_denied_keeps_stopped() {
    let fx = fixture(3).await;
    fx.focus.deny(true);
    let (mut session, _timers) = fx.session();

    let err = session
        .select_track(fx.playlist, &fx.id(0), 0)
        .await
        .unwrap_err();

    assert!(matches!(err, PlaybackError::FocusDenied));
    assert_eq!(session.state(), PlaybackState::Stopped);
    assert!(!fx.engine.is_playing());
    assert!(notices(&session.take_events()).is_empty());
}

#[tokio::test]
async fn test_transient_focus_loss_resumes_on_gain() {
    let fx = fixture(3).await;
    let (mut session, _timers) = fx.playing_at(0).await;

    session
        .focus_changed(FocusChange::LostTransient)
        .await
        .unwrap();
    assert_eq!(session.state(), PlaybackState::Paused);
    assert_eq!(fx.focus.abandons(), 0);

    session.focus_changed(FocusChange::Gained).await.unwrap();
    assert_eq!(session.state(), PlaybackState::Playing);
    assert!(fx.engine.is_playing());
    assert_eq!(fx.focus.requests(), 1);
}

#[tokio::test]
async fn test_user_pause_cancels_resume_on_gain() {
    let fx = fixture(3).await;
    let (mut session, _timers) = fx.playing_at(0).await;

    session
        .focus_changed(FocusChange::LostTransient)
        .await
        .unwrap();
    session.play().await.unwrap();
    session.pause().await.unwrap();
    session.focus_changed(FocusChange::Gained).await.unwrap();

    assert_eq!(session.state(), PlaybackState::Paused);
}

#[tokio::test]
async fn test_duck_and_restore_volume() {
    let fx = fixture(3).await;
    let (mut session, _timers) = fx.playing_at(0).await;

    session
        .focus_changed(FocusChange::LostTransientCanDuck)
        .await
        .unwrap();
    assert_eq!(session.state(), PlaybackState::Playing);
    assert_eq!(fx.engine.volume(), Some(config().duck_volume));

    session.focus_changed(FocusChange::Gained).await.unwrap();
    assert_eq!(fx.engine.volume(), Some(1.0));
    assert_eq!(session.state(), PlaybackState::Playing);
}

#[tokio::test]
async fn test_permanent_focus_loss_pauses() {
    let fx = fixture(3).await;
    let (mut session, _timers) = fx.playing_at(0).await;

    session.focus_changed(FocusChange::Lost).await.unwrap();
    assert_eq!(session.state(), PlaybackState::Paused);

    session.focus_changed(FocusChange::Gained).await.unwrap();
    assert_eq!(session.state(), PlaybackState::Paused);
}

#[tokio::test]
async fn test_output_disconnect_pauses() {
    let fx = fixture(3).await;
    let (mut session, _timers) = fx.playing_at(0).await;

    session.output_disconnected().await.unwrap();

    assert_eq!(session.state(), PlaybackState::Paused);
}

// ===== Timers =====

#[tokio::test(start_paused = true)]
async fn test_checkpoint_tick_saves_position() {
    let fx = fixture(3).await;
    let (mut session, mut timers) = fx.playing_at(0).await;

    fx.engine.advance_to(5_000);
    let fired = timers.recv().await.unwrap();
    assert_eq!(fired.kind, TimerKind::Checkpoint);
    session.handle_timer(fired).await;

    assert_eq!(fx.checkpoint().await.last_played_position_ms, 5_000);
}

#[tokio::test(start_paused = true)]
async fn test_stale_tick_after_stop_is_ignored() {
    let fx = fixture(3).await;
    let (mut session, mut timers) = fx.playing_at(0).await;

    let fired = timers.recv().await.unwrap();
    fx.engine.advance_to(7_000);
    session.stop().await.unwrap();
    session.take_events();

    // Replay a fire of the cancelled timer
    session.handle_timer(fired).await;

    assert_eq!(session.state(), PlaybackState::Stopped);
    assert_eq!(fx.checkpoint().await.last_played_position_ms, 7_000);
    assert!(session.take_events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_long_pause_stops() {
    let fx = fixture(3).await;
    let (mut session, mut timers) = fx.playing_at(0).await;
    session.pause().await.unwrap();

    let fired = timers.recv().await.unwrap();
    assert_eq!(fired.kind, TimerKind::Inactivity);
    session.handle_timer(fired).await;

    assert_eq!(session.state(), PlaybackState::Stopped);
    assert_eq!(fx.engine.loaded(), None);
}

#[tokio::test(start_paused = true)]
async fn test_inactivity_cancelled_by_play() {
    let fx = fixture(3).await;
    let (mut session, mut timers) = fx.playing_at(0).await;
    session.pause().await.unwrap();
    session.play().await.unwrap();
    session.pause().await.unwrap();

    // The first pause's timer was replaced; only the latest counts
    let mut stopped = false;
    while let Some(fired) = timers.recv().await {
        session.handle_timer(fired).await;
        if session.state() == PlaybackState::Stopped {
            stopped = true;
            break;
        }
    }
    assert!(stopped);
    assert_eq!(
        session
            .take_events()
            .iter()
            .filter(|e| matches!(
                e,
                PlaybackEvent::StateChanged {
                    state: PlaybackState::Stopped
                }
            ))
            .count(),
        1
    );
}

// ===== Persistence =====

#[tokio::test]
async fn test_persistence_failure_is_retried() {
    let fx = fixture(3).await;
    fx.store.fail_checkpoints(true);
    let (mut session, _timers) = fx.playing_at(0).await;

    fx.engine.advance_to(1_000);
    session.pause().await.unwrap();
    assert_eq!(session.state(), PlaybackState::Paused);
    assert_eq!(fx.checkpoint().await.last_played_track_id, None);

    fx.store.fail_checkpoints(false);
    session.seek(2_000).await.unwrap();

    let playlist = fx.checkpoint().await;
    assert_eq!(playlist.last_played_track_id, Some(fx.id(0)));
    assert_eq!(playlist.last_played_position_ms, 2_000);
}

#[tokio::test]
async fn test_restore_lands_paused_at_checkpoint() {
    let fx = fixture(3).await;
    {
        let (mut session, _timers) = fx.playing_at(1).await;
        fx.engine.advance_to(30_000);
        session.shutdown().await;
    }

    let (mut session, _timers) = fx.session();
    session.restore().await.unwrap();

    assert_eq!(session.state(), PlaybackState::Paused);
    assert_eq!(fx.engine.loaded(), Some(fx.id(1)));
    assert!(!fx.engine.is_playing());
    let snapshot = session.snapshot();
    assert_eq!(snapshot.position_ms, 30_000);
    assert!(snapshot.resumed_from_playing);
    assert_eq!(snapshot.playlist_id, Some(fx.playlist));

    session.play().await.unwrap();
    assert_eq!(session.state(), PlaybackState::Playing);
    assert!(!session.snapshot().resumed_from_playing);
}

#[tokio::test]
async fn test_restore_keeps_flags() {
    let fx = fixture(3).await;
    {
        let (mut session, _timers) = fx.playing_at(0).await;
        session.set_shuffle(true).await.unwrap();
        session.set_repeat_one(true).await.unwrap();
        session.pause().await.unwrap();
        session.shutdown().await;
    }

    let (mut session, _timers) = fx.session();
    session.restore().await.unwrap();

    assert!(session.queue().shuffle_enabled());
    assert!(session.repeat_one());
    assert_eq!(fx.engine.loaded(), Some(fx.id(0)));
    assert!(!session.snapshot().resumed_from_playing);
}

#[tokio::test]
async fn test_restore_with_unreachable_track_stays_stopped() {
    let fx = fixture(3).await;
    {
        let (mut session, _timers) = fx.playing_at(2).await;
        session.shutdown().await;
    }
    fx.probe.mark_unreachable(&fx.id(2));

    let (mut session, _timers) = fx.session();
    session.restore().await.unwrap();

    assert_eq!(session.state(), PlaybackState::Stopped);
    assert_eq!(
        notices(&session.take_events()),
        vec![Notice::TrackUnreachable { track_id: fx.id(2) }]
    );
}

#[tokio::test]
async fn test_restore_without_saved_session() {
    let fx = fixture(3).await;
    let (mut session, _timers) = fx.session();

    session.restore().await.unwrap();

    assert_eq!(session.state(), PlaybackState::Stopped);
    assert_eq!(session.queue().playlist_id(), None);
}

#[tokio::test]
async fn test_switching_playlists_checkpoints_the_old_one() {
    let fx = fixture(3).await;
    let other = fx.store.create_playlist("Other").await.unwrap();
    let other_tracks = seed_tracks(&fx.store, other.id, 2).await;
    let (mut session, _timers) = fx.playing_at(0).await;

    fx.engine.advance_to(12_000);
    session
        .select_track(other.id, &other_tracks[1].id, 0)
        .await
        .unwrap();

    let first = fx.checkpoint().await;
    assert_eq!(first.last_played_track_id, Some(fx.id(0)));
    assert_eq!(first.last_played_position_ms, 12_000);
    assert_eq!(fx.saved_session().await.active_playlist_id, Some(other.id));
    assert_eq!(fx.engine.loaded(), Some(other_tracks[1].id.clone()));
}

// ===== Queue edits =====

#[tokio::test]
async fn test_removing_current_track_moves_on() {
    let fx = fixture(4).await;
    let (mut session, _timers) = fx.playing_at(1).await;

    let removed = session.remove_tracks(&[fx.id(1)]).await.unwrap();

    assert_eq!(removed, 1);
    assert_eq!(session.state(), PlaybackState::Playing);
    let loaded = fx.engine.loaded().unwrap();
    assert_ne!(loaded, fx.id(1));
    assert_eq!(session.queue().peek_current().map(|t| t.id.clone()), Some(loaded));
}

#[tokio::test]
async fn test_removing_every_track_stops() {
    let fx = fixture(3).await;
    let (mut session, _timers) = fx.playing_at(0).await;
    session.take_events();

    let all: Vec<TrackId> = (0..3).map(|i| fx.id(i)).collect();
    session.remove_tracks(&all).await.unwrap();

    assert_eq!(session.state(), PlaybackState::Stopped);
    let events = session.take_events();
    assert_eq!(notices(&events), vec![Notice::EmptyQueue]);
    assert!(events.contains(&PlaybackEvent::QueueChanged { len: 0 }));
}

#[tokio::test]
async fn test_append_keeps_current_track() {
    let fx = fixture(2).await;
    let (mut session, _timers) = fx.playing_at(1).await;

    let added = session
        .append_tracks(vec![reprise_core::NewTrack::new(
            "/music/new.flac",
            "New",
            "Artist",
        )])
        .await
        .unwrap();

    assert_eq!(added, 1);
    assert_eq!(session.queue().len(), 3);
    assert_eq!(fx.engine.loads(), vec![fx.id(1)]);
}

#[tokio::test]
async fn test_edits_need_an_active_playlist() {
    let fx = fixture(2).await;
    let (mut session, _timers) = fx.session();

    let err = session.move_track(0, 1).await.unwrap_err();

    assert!(matches!(err, PlaybackError::InvalidOperation(_)));
}

#[tokio::test]
async fn test_delete_active_playlist_stops() {
    let fx = fixture(3).await;
    let (mut session, _timers) = fx.playing_at(0).await;

    assert!(session.delete_playlist(fx.playlist).await.unwrap());

    assert_eq!(session.state(), PlaybackState::Stopped);
    assert_eq!(session.queue().playlist_id(), None);
    assert_eq!(fx.saved_session().await.active_playlist_id, None);
    assert!(fx.store.get_playlist(fx.playlist).await.unwrap().is_none());
}

// ===== Shuffle =====

#[tokio::test]
async fn test_shuffle_skip_next_passes_over_unreachable_tracks() {
    let fx = fixture(4).await;
    let (mut session, _timers) = fx.playing_at(0).await;
    session.set_shuffle(true).await.unwrap();
    fx.probe.mark_unreachable(&fx.id(1));
    fx.probe.mark_unreachable(&fx.id(2));
    session.take_events();

    session.skip_next().await.unwrap();

    assert_eq!(session.state(), PlaybackState::Playing);
    assert_eq!(fx.engine.loaded(), Some(fx.id(3)));
    assert_eq!(current(&session), Some(fx.id(3)));

    // Every track drawn on the way stays in the history, in draw order
    let history = stack(&session);
    assert_eq!(history.first(), Some(&fx.id(0)));
    assert_eq!(history.last(), Some(&fx.id(3)));
    let passed: Vec<TrackId> = history[1..history.len() - 1].to_vec();
    let expected: Vec<Notice> = if passed.is_empty() {
        Vec::new()
    } else {
        vec![Notice::TracksSkipped { track_ids: passed }]
    };
    assert_eq!(notices(&session.take_events()), expected);
}

#[tokio::test]
async fn test_shuffle_skip_previous_stops_at_first_entry() {
    let fx = fixture(4).await;
    let (mut session, _timers) = fx.playing_at(0).await;
    session.set_shuffle(true).await.unwrap();
    session.skip_next().await.unwrap();
    let playing = fx.engine.loaded().unwrap();
    let loads = fx.engine.loads().len();
    fx.probe.mark_unreachable(&fx.id(0));
    session.take_events();

    session.skip_previous().await.unwrap();

    // Nothing readable behind: keep the track that was playing
    assert_eq!(session.state(), PlaybackState::Playing);
    assert_eq!(fx.engine.loaded(), Some(playing.clone()));
    assert!(fx.engine.is_playing());
    assert_eq!(fx.engine.loads().len(), loads);
    assert_eq!(current(&session), Some(playing.clone()));
    assert_eq!(stack(&session), vec![fx.id(0), playing]);
    assert_eq!(
        notices(&session.take_events()),
        vec![Notice::TracksSkipped {
            track_ids: vec![fx.id(0)]
        }]
    );
}

#[tokio::test]
async fn test_shuffle_skip_previous_replays_history() {
    let fx = fixture(4).await;
    let (mut session, _timers) = fx.playing_at(0).await;
    session.set_shuffle(true).await.unwrap();
    session.skip_next().await.unwrap();
    session.skip_next().await.unwrap();
    let history = stack(&session);

    session.skip_previous().await.unwrap();
    assert_eq!(fx.engine.loaded(), Some(history[1].clone()));

    session.skip_next().await.unwrap();
    assert_eq!(fx.engine.loaded(), Some(history[2].clone()));
    assert_eq!(stack(&session), history);
}

#[tokio::test]
async fn test_shuffle_end_of_cycle_pauses_on_a_new_track() {
    let fx = fixture(3).await;
    let (mut session, _timers) = fx.playing_at(0).await;
    session.set_shuffle(true).await.unwrap();

    session.track_ended().await.unwrap();
    session.track_ended().await.unwrap();
    assert_eq!(session.state(), PlaybackState::Playing);
    assert!(session.queue().is_ended());
    let anchor = fx.engine.loaded().unwrap();
    let mut cycle = stack(&session);
    cycle.sort();
    assert_eq!(cycle, vec![fx.id(0), fx.id(1), fx.id(2)]);

    session.track_ended().await.unwrap();

    assert_eq!(session.state(), PlaybackState::Paused);
    assert!(!fx.engine.is_playing());
    let next = fx.engine.loaded().unwrap();
    assert_ne!(next, anchor);
    assert_eq!(stack(&session), vec![next.clone()]);
    assert_eq!(session.queue().session().unwrap().pool().len(), 2);
    assert_eq!(fx.checkpoint().await.last_played_track_id, Some(next));
}

#[tokio::test]
async fn test_shuffle_history_survives_restore() {
    let fx = fixture(4).await;
    let before;
    let saved_track;
    {
        let (mut session, _timers) = fx.playing_at(0).await;
        session.set_shuffle(true).await.unwrap();
        session.skip_next().await.unwrap();
        session.skip_next().await.unwrap();
        session.skip_previous().await.unwrap();
        fx.engine.advance_to(20_000);
        before = stack(&session);
        saved_track = fx.engine.loaded().unwrap();
        session.shutdown().await;
    }
    assert_eq!(before.len(), 3);
    assert_eq!(saved_track, before[1]);

    let (mut session, _timers) = fx.session();
    session.restore().await.unwrap();

    assert_eq!(session.state(), PlaybackState::Paused);
    assert!(session.queue().shuffle_enabled());
    assert_eq!(current(&session), Some(saved_track.clone()));
    assert_eq!(session.snapshot().position_ms, 20_000);

    // The saved track moves to the top of the reloaded history
    let expected = vec![before[0].clone(), before[2].clone(), saved_track];
    assert_eq!(stack(&session), expected);
    let stored: Vec<TrackId> = fx
        .store
        .list_shuffle_history(fx.playlist)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(stored, expected);
    assert_eq!(session.queue().session().unwrap().pool().len(), 1);
}
