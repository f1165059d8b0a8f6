#![no_main]

use libfuzzer_sys::fuzz_target;
use linkhub::audio::{AutoplayPolicy, MediaPlayer, NullMediaPlayer};
use linkhub::model::TrackDescriptor;
use linkhub::transport::{Transport, TransportState};
use std::path::PathBuf;
use std::time::Duration;

fuzz_target!(|data: &[u8]| {
    let len = data.first().map_or(0, |byte| usize::from(*byte % 8));
    let tracks = (0..len)
        .map(|idx| TrackDescriptor {
            title: format!("track {idx}"),
            artist: String::new(),
            media_source: PathBuf::from(format!("track_{idx}.mp3")),
            cover_image: PathBuf::from(format!("track_{idx}.jpg")),
        })
        .collect();
    let mut player = NullMediaPlayer::new().with_fallback_duration(Duration::from_secs(2));
    let mut transport = Transport::new(tracks);
    transport.load_at(0, &mut player);

    for byte in data.iter().skip(1) {
        match byte % 11 {
            0 => transport.toggle_play(&mut player),
            1 => transport.next(&mut player),
            2 => transport.previous(&mut player),
            3 => transport.request_pause(&mut player),
            4 => {
                transport.load_at(i64::from(*byte as i8), &mut player);
            }
            5 => transport.seek_to_fraction(f64::from(*byte) / 255.0, &mut player),
            6 => player.advance(Duration::from_millis(u64::from(*byte) * 10)),
            7 => player.set_policy(AutoplayPolicy::Deny),
            8 => player.set_policy(AutoplayPolicy::Allow),
            9 => {
                transport.request_play(&mut player);
                transport.request_play(&mut player);
            }
            _ => {
                for event in player.poll_events() {
                    transport.handle_event(event, &mut player);
                }
            }
        }

        if len == 0 {
            assert_eq!(transport.state(), TransportState::Idle);
        } else {
            assert!(transport.current_index() < len);
        }
        if transport.state() == TransportState::LoadedPlaying {
            assert!(!player.is_paused());
        }
        if transport.state() == TransportState::LoadedPaused {
            assert!(player.is_paused());
        }
    }
});
