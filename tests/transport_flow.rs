use linkhub::audio::{AutoplayPolicy, MediaPlayer, NullMediaPlayer};
use linkhub::config;
use linkhub::core::{HubCommand, HubCore};
use linkhub::model::HubConfig;
use linkhub::transport::TransportState;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

fn pump(core: &mut HubCore, player: &mut NullMediaPlayer) {
    for event in player.poll_events() {
        core.handle_media_event(event, player);
    }
}

fn hub_from(config: &HubConfig, base: &Path) -> HubCore {
    HubCore::new(
        config.playlist(base),
        config.initial_volume,
        config.default_cover_path(base),
    )
}

#[test]
fn config_file_drives_a_listening_session() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("linkhub.json");
    fs::write(
        &path,
        r#"{
            "random_on_load": false,
            "initial_volume": 25,
            "tracks": [
                {"title": "Come As You Are", "artist": "Nirvana", "src": "songs/1.mp3"},
                {"title": "Buddy Holly", "artist": "Weezer", "src": "songs/2.mp3"}
            ]
        }"#,
    )
    .expect("write config");

    let loaded = config::load_config_from(&path).expect("load");
    let base = config::media_base_for(&path);
    let mut player = NullMediaPlayer::new().with_fallback_duration(Duration::from_secs(3));
    let mut core = hub_from(&loaded, &base);

    core.start(&mut player, loaded.random_on_load, loaded.autoplay);
    assert_eq!(player.volume(), 0.25);
    assert_eq!(
        player.current_source(),
        Some(dir.path().join("songs/1.mp3").as_path())
    );
    pump(&mut core, &mut player);
    assert!(core.transport.is_playing());

    player.advance(Duration::from_secs(4));
    pump(&mut core, &mut player);
    pump(&mut core, &mut player);
    assert_eq!(core.transport.current_index(), 1);
    assert!(core.transport.is_playing());

    player.advance(Duration::from_secs(4));
    pump(&mut core, &mut player);
    pump(&mut core, &mut player);
    assert_eq!(core.transport.current_index(), 0);
    assert!(core.transport.is_playing());
}

#[test]
fn refused_autoplay_then_user_starts_playback() {
    let config = HubConfig {
        random_on_load: false,
        ..HubConfig::default()
    };
    let base = Path::new("/srv/linkhub");
    let mut player = NullMediaPlayer::new().with_policy(AutoplayPolicy::RequireGesture);
    let mut core = hub_from(&config, base);

    core.start(&mut player, config.random_on_load, config.autoplay);
    assert_eq!(core.transport.state(), TransportState::PendingPlay);
    pump(&mut core, &mut player);
    assert_eq!(core.transport.state(), TransportState::LoadedPaused);
    assert!(player.is_paused());

    core.run_command(HubCommand::Play(Some(5)), &mut player);
    pump(&mut core, &mut player);
    assert_eq!(core.transport.current_index(), 4);
    assert!(core.transport.is_playing());
    assert_eq!(
        core.transport.current_track().map(|track| track.title.as_str()),
        Some("Piano Man")
    );
}

#[test]
fn racing_user_actions_never_show_a_stale_play() {
    let config = HubConfig {
        random_on_load: false,
        autoplay: false,
        ..HubConfig::default()
    };
    let mut player = NullMediaPlayer::new();
    let mut core = hub_from(&config, Path::new("."));
    core.start(&mut player, false, false);

    core.toggle_play(&mut player);
    core.next(&mut player);
    core.next(&mut player);
    pump(&mut core, &mut player);

    assert_eq!(core.transport.current_index(), 2);
    assert_eq!(core.transport.state(), TransportState::LoadedPaused);
    assert!(player.is_paused());
}

#[test]
fn empty_playlist_is_inert() {
    let config = HubConfig {
        tracks: Vec::new(),
        ..HubConfig::default()
    };
    let mut player = NullMediaPlayer::new();
    let mut core = hub_from(&config, Path::new("."));
    core.start(&mut player, true, true);

    assert_eq!(core.status, "No songs found");
    core.next(&mut player);
    core.toggle_play(&mut player);
    core.seek_fraction(0.5, &mut player);
    pump(&mut core, &mut player);
    assert_eq!(core.transport.state(), TransportState::Idle);
    assert!(player.current_source().is_none());
}
