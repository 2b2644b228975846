//! Benchmarks for timeline tracking
//!
//! The tracker runs on every player time update (about 5 times per second per
//! viewer) and the schedule is re-decoded on every linear poll, so both sit on
//! the hot path of a session.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use serde_json::json;
use tailtrack::schedule::decoder::decode_schedule;
use tailtrack::schedule::{Ad, AdBreak, Schedule};
use tailtrack::tracking::TimelineTracker;

const ADS_PER_BREAK: usize = 4;
const AD_DURATION: f64 = 15.0;
const CONTENT_BETWEEN_BREAKS: f64 = 120.0;
const TICK: f64 = 0.2;

fn break_start(index: usize) -> f64 {
    index as f64 * (CONTENT_BETWEEN_BREAKS + ADS_PER_BREAK as f64 * AD_DURATION)
        + CONTENT_BETWEEN_BREAKS
}

/// Schedule of `break_count` breaks, each with `ADS_PER_BREAK` back-to-back ads
fn generate_schedule(break_count: usize) -> Schedule {
    (0..break_count)
        .map(|b| {
            let start = break_start(b);
            AdBreak {
                id: format!("avail-{}", b),
                schedule_time: start,
                duration: ADS_PER_BREAK as f64 * AD_DURATION,
                formatted_duration: format!("PT{}S", ADS_PER_BREAK as f64 * AD_DURATION),
                ad_marker_duration: None,
                ads: (0..ADS_PER_BREAK)
                    .map(|a| Ad {
                        id: format!("ad-{}-{}", b, a),
                        schedule_time: start + a as f64 * AD_DURATION,
                        duration: AD_DURATION,
                        formatted_duration: format!("PT{}S", AD_DURATION),
                        tracking_events: vec![],
                    })
                    .collect(),
            }
        })
        .collect()
}

/// MediaTailor tracking response with `break_count` avails
fn generate_tracking_json(break_count: usize) -> String {
    let quartiles = ["start", "firstQuartile", "midpoint", "thirdQuartile", "complete"];
    let avails: Vec<_> = (0..break_count)
        .map(|b| {
            let start = break_start(b);
            let ads: Vec<_> = (0..ADS_PER_BREAK)
                .map(|a| {
                    let ad_start = start + a as f64 * AD_DURATION;
                    let events: Vec<_> = quartiles
                        .iter()
                        .enumerate()
                        .map(|(q, event_type)| {
                            json!({
                                "eventId": format!("{}", q),
                                "eventType": event_type,
                                "beaconUrls": [format!(
                                    "https://tracking.example.com/{}?ad={}-{}", event_type, b, a
                                )],
                                "durationInSeconds": 0.0,
                                "startTimeInSeconds": ad_start + q as f64 * AD_DURATION / 4.0
                            })
                        })
                        .collect();
                    json!({
                        "adId": format!("ad-{}-{}", b, a),
                        "duration": format!("PT{}S", AD_DURATION),
                        "durationInSeconds": AD_DURATION,
                        "startTimeInSeconds": ad_start,
                        "trackingEvents": events
                    })
                })
                .collect();
            json!({
                "availId": format!("avail-{}", b),
                "duration": format!("PT{}S", ADS_PER_BREAK as f64 * AD_DURATION),
                "durationInSeconds": ADS_PER_BREAK as f64 * AD_DURATION,
                "startTimeInSeconds": start,
                "ads": ads
            })
        })
        .collect();
    json!({ "avails": avails }).to_string()
}

fn bench_steady_playback(c: &mut Criterion) {
    let mut group = c.benchmark_group("steady_playback");

    for break_count in [1, 10, 100] {
        let schedule = generate_schedule(break_count);
        let end = break_start(break_count);
        let ticks: Vec<f64> = (0..).map(|i| i as f64 * TICK).take_while(|t| *t < end).collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(break_count),
            &ticks,
            |b, ticks| {
                b.iter(|| {
                    let mut tracker = TimelineTracker::new(schedule.clone());
                    for &time in ticks {
                        tracker.update(black_box(time));
                    }
                    tracker.cursor()
                })
            },
        );
    }

    group.finish();
}

fn bench_seek(c: &mut Criterion) {
    let mut group = c.benchmark_group("seek_and_update");

    for break_count in [10, 100] {
        let schedule = generate_schedule(break_count);
        let target = break_start(break_count - 1) + AD_DURATION * 2.5;
        let mut tracker = TimelineTracker::new(schedule);

        group.bench_function(BenchmarkId::from_parameter(break_count), |b| {
            b.iter(|| {
                tracker.reset();
                tracker.update(black_box(target));
                tracker.cursor()
            })
        });
    }

    group.finish();
}

fn bench_decode_schedule(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_schedule");

    for break_count in [1, 10, 50] {
        let body = generate_tracking_json(break_count);
        group.bench_with_input(
            BenchmarkId::from_parameter(break_count),
            &body,
            |b, body| b.iter(|| decode_schedule(black_box(body))),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_steady_playback,
    bench_seek,
    bench_decode_schedule
);
criterion_main!(benches);
