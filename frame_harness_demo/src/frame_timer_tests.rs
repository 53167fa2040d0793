use super::*;

#[test]
fn test_new_timer_is_zero() {
    let timer = FrameTimer::new();
    assert_eq!(timer.delta_time_ms(), 0.0);
    assert_eq!(timer.time_since_start_ms(), 0.0);
    assert_eq!(timer.fps(), 0.0);
}

#[test]
fn test_tick_measures_delta() {
    let mut timer = FrameTimer::new();
    let start = timer.start;

    timer.tick_at(start + Duration::from_millis(16));
    assert!((timer.delta_time_ms() - 16.0).abs() < 1e-9);

    timer.tick_at(start + Duration::from_millis(20));
    assert!((timer.delta_time_ms() - 4.0).abs() < 1e-9);
    assert!((timer.fps() - 250.0).abs() < 1e-6);
}

#[test]
fn test_time_since_start_accumulates() {
    let mut timer = FrameTimer::new();
    let start = timer.start;

    for frame in 1..=10u64 {
        timer.tick_at(start + Duration::from_millis(frame * 10));
    }
    assert!((timer.time_since_start_ms() - 100.0).abs() < 1e-9);
}

#[test]
fn test_tick_in_the_past_saturates() {
    let mut timer = FrameTimer::new();
    let start = timer.start;
    timer.tick_at(start + Duration::from_millis(50));

    timer.tick_at(start);
    assert_eq!(timer.delta_time_ms(), 0.0);
}

#[test]
fn test_reset() {
    let mut timer = FrameTimer::new();
    let start = timer.start;
    timer.tick_at(start + Duration::from_millis(30));

    timer.reset();
    assert_eq!(timer.delta_time_ms(), 0.0);
    assert_eq!(timer.time_since_start_ms(), 0.0);
}
